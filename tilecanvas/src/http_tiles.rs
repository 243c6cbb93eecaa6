use std::sync::{Arc, Mutex};

use egui::Context;
use futures::channel::mpsc::{Receiver, Sender, TrySendError, channel};

use crate::cache::TileCache;
use crate::io::runtime::IoThread;
use crate::io::{FetchError, HttpFetch, HttpOptions, Stats, fetch_continuously};
use crate::sources::{Attribution, TileSource};
use crate::tiles::{Tile, TileId, Tiles};

/// Downloads the tiles via HTTP. It must persist between frames.
///
/// Tiles which are not in the cache yet are requested from the IO thread, and a "loading"
/// placeholder is returned in the meantime. Tiles which could not be fetched are remembered as
/// "missing" placeholders, so they are not requested again.
pub struct HttpTiles {
    attribution: Attribution,
    cache: TileCache,
    stats: Arc<Mutex<Stats>>,

    /// Tiles to be downloaded by the IO thread.
    request_tx: Sender<TileId>,

    /// Tiles that got downloaded and should be put in the cache.
    tile_rx: Receiver<(TileId, Tile)>,

    /// Tiles put in the cache since the last [`Tiles::updated`].
    arrived: Vec<TileId>,

    #[expect(dead_code)] // Significant Drop
    io_thread: IoThread,

    max_zoom: u8,
}

impl HttpTiles {
    /// Construct new [`Tiles`] with default [`HttpOptions`].
    pub fn new<S>(source: S, egui_ctx: Context) -> Result<Self, FetchError>
    where
        S: TileSource + Send + Sync + 'static,
    {
        Self::with_options(source, HttpOptions::default(), egui_ctx)
    }

    /// Construct new [`Tiles`] with supplied [`HttpOptions`].
    pub fn with_options<S>(
        source: S,
        options: HttpOptions,
        egui_ctx: Context,
    ) -> Result<Self, FetchError>
    where
        S: TileSource + Send + Sync + 'static,
    {
        let cache = TileCache::new(options.cache_capacity);
        Self::with_cache(source, options, cache, egui_ctx)
    }

    /// Construct new [`Tiles`] storing tiles in the given cache.
    pub fn with_cache<S>(
        source: S,
        options: HttpOptions,
        cache: TileCache,
        egui_ctx: Context,
    ) -> Result<Self, FetchError>
    where
        S: TileSource + Send + Sync + 'static,
    {
        let stats = Arc::new(Mutex::new(Stats::default()));

        // This ensures that newer requests are prioritized.
        let channel_size = options.max_parallel_downloads.0;

        let (request_tx, request_rx) = channel(channel_size);
        let (tile_tx, tile_rx) = channel(channel_size);
        let attribution = source.attribution();
        let max_zoom = source.max_zoom();

        let fetch = HttpFetch::new(source, &options)?;

        // This will run concurrently in a loop, handing downloads and talk with us via channels.
        let io_thread = IoThread::spawn(fetch_continuously(
            fetch,
            Arc::clone(&stats),
            request_rx,
            tile_tx,
            egui_ctx,
        ));

        Ok(Self {
            attribution,
            cache,
            stats,
            request_tx,
            tile_rx,
            arrived: Vec::new(),
            io_thread,
            max_zoom,
        })
    }

    /// Attribution of the source this tile cache pulls images from.
    pub fn attribution(&self) -> Attribution {
        self.attribution.clone()
    }

    pub fn stats(&self) -> Stats {
        if let Ok(stats) = self.stats.lock() {
            stats.clone()
        } else {
            Stats::default()
        }
    }

    fn put_downloaded_tiles_in_cache(&mut self) {
        loop {
            match self.tile_rx.try_next() {
                Ok(Some((tile_id, tile))) => {
                    log::trace!("Tile {tile_id:?} arrived as {:?}.", tile.kind());
                    self.cache.insert(tile_id, tile);
                    self.arrived.push(tile_id);
                }
                Ok(None) => {
                    log::error!("IO thread is dead");
                    break;
                }
                // Nothing new was downloaded.
                Err(_) => break,
            }
        }
    }

    fn make_sure_is_requested(&mut self, tile_id: TileId) {
        let requested = self.cache.request_once(tile_id, || -> Result<(), TrySendError<TileId>> {
            self.request_tx.try_send(tile_id)?;
            log::trace!("Requested tile: {tile_id:?}");
            Ok(())
        });

        if let Err(err) = requested {
            if err.is_full() {
                log::debug!("Request queue is full.");
            } else {
                log::error!("IO thread does not take requests anymore.");
            }
        }
    }
}

impl Tiles for HttpTiles {
    /// Return a tile if already in cache, schedule a download otherwise.
    fn at(&mut self, tile_id: TileId) -> Option<Tile> {
        self.put_downloaded_tiles_in_cache();

        if !tile_id.valid() || tile_id.zoom > self.max_zoom {
            return None;
        }

        if let Some(tile) = self.cache.get(tile_id) {
            return Some(tile.clone());
        }

        self.make_sure_is_requested(tile_id);
        Some(Tile::loading())
    }

    fn updated(&mut self) -> Vec<TileId> {
        self.put_downloaded_tiles_in_cache();
        std::mem::take(&mut self.arrived)
    }
}
