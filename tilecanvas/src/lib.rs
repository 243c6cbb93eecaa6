//! Slippy map engine: raster tiles from a web tile server with GeoJSON points, lines and shapes
//! drawn on top, kept in a retained scene and painted by an [`egui`] widget.
//!
//! ```no_run
//! # use tilecanvas::{HttpTiles, Map, MapMemory, MapOptions, Zoom, lat_lon, sources::OpenStreetMap};
//! # fn make(ctx: egui::Context) -> Result<(HttpTiles, MapMemory), tilecanvas::FetchError> {
//! let tiles = HttpTiles::new(OpenStreetMap, ctx)?;
//! let memory = MapMemory::new(lat_lon(51.1, 17.03), Zoom::default(), MapOptions::default());
//! # Ok((tiles, memory))
//! # }
//! ```
#![deny(clippy::unwrap_used, rustdoc::broken_intra_doc_links)]

mod cache;
pub mod controller;
pub mod feature;
mod http_tiles;
mod io;
mod label;
pub mod layer;
mod map;
mod mask;
mod memory;
pub mod mercator;
mod options;
mod position;
pub mod scene;
pub mod sources;
pub mod style;
mod tiles;
pub mod viewport;
mod zoom;

pub use cache::TileCache;
pub use feature::{Feature, FeatureFamily, FeatureFilter, FeatureLoader, Geometry, GeometryType};
pub use http_tiles::HttpTiles;
pub use io::{Fetch, FetchError, HttpFetch, HttpOptions, MaxParallelDownloads, Stats};
pub use layer::{Interaction, Layer, LayerError, layers_from_geojson};
pub use map::Map;
pub use memory::MapMemory;
pub use options::MapOptions;
pub use position::{GeoBounds, Position, lat_lon, lon_lat};
pub use tiles::{Tile, TileError, TileId, TileKind, Tiles, request_tile};
pub use zoom::{InvalidZoom, MAX_ZOOM, Zoom};
