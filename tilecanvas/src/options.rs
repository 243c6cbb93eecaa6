use std::time::Duration;

use crate::mercator::TILE_SIZE;
use crate::zoom::Zoom;

/// Tunables of the map session.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapOptions {
    /// Edge of a tile in pixels.
    pub tile_size: u32,

    /// Tiles laid out beyond the ones needed to cover the surface, per axis.
    pub tile_slack: u32,

    pub min_zoom: Zoom,
    pub max_zoom: Zoom,

    /// Quiet period after the last resize event before the map is redrawn.
    pub resize_debounce: Duration,

    /// Show the coordinates of the center and the zoom in the bottom-right corner.
    pub status_overlay: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            tile_slack: 3,
            min_zoom: Zoom::saturating(1),
            max_zoom: Zoom::saturating(19),
            resize_debounce: Duration::from_millis(200),
            status_overlay: true,
        }
    }
}
