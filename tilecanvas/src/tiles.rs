use std::io::Cursor;
use std::sync::OnceLock;

use bytes::Bytes;
use image::{ImageError, ImageFormat, Rgba, RgbaImage};

use crate::mercator::{TILE_SIZE, total_tiles};
use crate::zoom::{InvalidZoom, Zoom};

/// Source of tiles to be put together to render the map.
pub trait Tiles {
    /// Tile for the given id. Implementations may return a placeholder while the real raster is
    /// on its way.
    fn at(&mut self, tile_id: TileId) -> Option<Tile>;

    /// Tiles which became available since the last call, so that their slots can be redrawn.
    fn updated(&mut self) -> Vec<TileId> {
        Vec::new()
    }
}

/// Identifies the tile in the tile grid.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TileId {
    /// X number of the tile.
    pub x: u32,

    /// Y number of the tile.
    pub y: u32,

    /// Zoom level, where 0 means no zoom.
    /// See: <https://wiki.openstreetmap.org/wiki/Zoom_levels>
    pub zoom: u8,
}

impl TileId {
    /// Tile at the given grid index, or `None` if the index lies outside of the world.
    pub fn checked(zoom: u8, x: i64, y: i64) -> Option<TileId> {
        let tile_id = TileId {
            x: u32::try_from(x).ok()?,
            y: u32::try_from(y).ok()?,
            zoom,
        };
        tile_id.valid().then_some(tile_id)
    }

    pub fn valid(&self) -> bool {
        let total = total_tiles(self.zoom);
        u64::from(self.x) < total && u64::from(self.y) < total
    }
}

/// Ask `tiles` for the tile at the given grid index.
///
/// Zoom outside of the supported range is an error. An index outside of the world is a legitimate
/// request (e.g. a wide viewport at low zoom) which just yields no tile, and never reaches `tiles`.
pub fn request_tile(
    tiles: &mut dyn Tiles,
    zoom: u8,
    x: i64,
    y: i64,
) -> Result<Option<Tile>, InvalidZoom> {
    let zoom = Zoom::try_from(zoom)?;

    Ok(match TileId::checked(zoom.level(), x, y) {
        Some(tile_id) => tiles.at(tile_id),
        None => {
            log::trace!("Tile {x},{y} is off the world at zoom {zoom}.");
            None
        }
    })
}

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("not a recognized raster image")]
    UnknownFormat,

    #[error(transparent)]
    Image(#[from] ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    /// Raster delivered by the tile source.
    Raster,

    /// Stand-in for a tile which could not be fetched.
    Missing,

    /// Stand-in shown while the tile is being fetched.
    Loading,
}

/// Encoded raster of a single tile.
#[derive(Debug, Clone)]
pub struct Tile {
    bytes: Bytes,
    kind: TileKind,
}

impl Tile {
    /// Wrap bytes received from a tile source, making sure they look like an image.
    pub fn raster(bytes: Bytes) -> Result<Self, TileError> {
        image::guess_format(&bytes).map_err(|_| TileError::UnknownFormat)?;
        Ok(Self {
            bytes,
            kind: TileKind::Raster,
        })
    }

    pub fn missing() -> Self {
        static MISSING: OnceLock<Bytes> = OnceLock::new();
        Self {
            bytes: MISSING.get_or_init(|| placeholder(true)).clone(),
            kind: TileKind::Missing,
        }
    }

    pub fn loading() -> Self {
        static LOADING: OnceLock<Bytes> = OnceLock::new();
        Self {
            bytes: LOADING.get_or_init(|| placeholder(false)).clone(),
            kind: TileKind::Loading,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind != TileKind::Raster
    }

    pub fn decode(&self) -> Result<RgbaImage, TileError> {
        Ok(image::load_from_memory(&self.bytes)?.to_rgba8())
    }
}

const PLACEHOLDER_BACKGROUND: Rgba<u8> = Rgba([0xe0, 0xe0, 0xe0, 0xff]);
const PLACEHOLDER_MARKER: Rgba<u8> = Rgba([0xb0, 0xb0, 0xb0, 0xff]);

/// Neutral tile-sized PNG, crossed out if `marked`.
fn placeholder(marked: bool) -> Bytes {
    let mut image = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, PLACEHOLDER_BACKGROUND);

    if marked {
        let last = TILE_SIZE - 1;
        for i in 0..TILE_SIZE {
            // Border.
            for (x, y) in [(i, 0), (i, last), (0, i), (last, i)] {
                image.put_pixel(x, y, PLACEHOLDER_MARKER);
            }

            // Both diagonals, 3px wide.
            for w in i.saturating_sub(1)..=(i + 1).min(last) {
                image.put_pixel(w, i, PLACEHOLDER_MARKER);
                image.put_pixel(last - w, i, PLACEHOLDER_MARKER);
            }
        }
    }

    let mut encoded = Vec::new();
    if let Err(err) = image.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png) {
        log::error!("Could not encode placeholder tile: {err}");
    }
    Bytes::from(encoded)
}
