//! Project the lat/lon coordinates into fractional tile space using the Web Mercator.
//! <https://en.wikipedia.org/wiki/Web_Mercator_projection>
//! <https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames>

use crate::position::{Position, lon_lat};
use std::f64::consts::PI;

// zoom level   tile coverage  number of tiles  tile size(*) in degrees
// 0            1 tile         1 tile           360° x 170.1022°
// 1            2 × 2 tiles    4 tiles          180° x 85.0511°
// 2            4 × 4 tiles    16 tiles         90° x [variable]

/// Size of a single tile in pixels, as most of the tile sources use.
pub const TILE_SIZE: u32 = 256;

/// Number of tiles along one axis of the world at the given zoom, saturating beyond what `u64`
/// holds.
pub fn total_tiles(zoom: u8) -> u64 {
    1u64.checked_shl(u32::from(zoom)).unwrap_or(u64::MAX)
}

/// Size of the world in tiles, for fractional tile math at any zoom.
fn world_size(zoom: u8) -> f64 {
    2f64.powi(i32::from(zoom))
}

/// Fractional position in the tile grid of a zoom level. The integer part identifies the tile,
/// the fraction is the position within that tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCoord {
    pub x: f64,
    pub y: f64,
}

impl TileCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift by a number of tiles along both axes.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Project geographical position into fractional tile coordinates.
///
/// The latitude must be within (-90, 90), the result is not finite at the poles.
pub fn to_tile(position: Position, zoom: u8) -> TileCoord {
    let n = world_size(zoom);

    let x = (position.x() + 180.) / 360. * n;
    let y = (1. - position.y().to_radians().tan().asinh() / PI) / 2. * n;

    TileCoord { x, y }
}

/// Inverse of [`to_tile`].
pub fn to_position(coord: TileCoord, zoom: u8) -> Position {
    let n = world_size(zoom);

    let lon = coord.x / n * 360. - 180.;
    let lat = (PI * (1. - 2. * coord.y / n)).sinh().atan().to_degrees();

    lon_lat(lon, lat)
}
