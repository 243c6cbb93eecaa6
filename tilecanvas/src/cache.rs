use std::num::NonZeroUsize;

use lru::LruCache;

use crate::tiles::{Tile, TileId};

/// Bounded in-memory tile store, keyed by `(zoom, x, y)`. Least recently used tiles are evicted
/// first.
///
/// An entry without a tile marks a request that is still in flight, so that the same tile is never
/// requested twice in parallel.
pub struct TileCache {
    entries: LruCache<TileId, Option<Tile>>,
}

impl TileCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, tile_id: TileId) -> Option<&Tile> {
        self.entries.get(&tile_id).and_then(Option::as_ref)
    }

    /// Whether the tile is either available or already requested.
    pub fn contains(&self, tile_id: TileId) -> bool {
        self.entries.contains(&tile_id)
    }

    /// Mark the tile as requested, unless it is already known. `request` is called only for
    /// unknown tiles, and the mark is not left behind if it fails.
    pub fn request_once<E>(
        &mut self,
        tile_id: TileId,
        request: impl FnOnce() -> Result<(), E>,
    ) -> Result<(), E> {
        self.entries
            .try_get_or_insert(tile_id, || request().map(|()| None))
            .map(|_| ())
    }

    pub fn insert(&mut self, tile_id: TileId, tile: Tile) {
        self.entries.put(tile_id, Some(tile));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TileCache {
    fn default() -> Self {
        // Just arbitrary value which seemed right.
        Self::new(NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN))
    }
}
