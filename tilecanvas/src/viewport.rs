//! Keeps the tile grid and the projected geometry glued together on the surface.

use egui::{Pos2, Vec2, pos2};

use crate::mercator::{TileCoord, to_position, to_tile};
use crate::options::MapOptions;
use crate::position::{GeoBounds, Position};
use crate::zoom::Zoom;

/// Dimensions of the drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Surface which is not really laid out yet, such as a window before it is mapped.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 1 || self.height <= 1
    }

    fn half(&self) -> (f64, f64) {
        (self.width as f64 / 2., self.height as f64 / 2.)
    }
}

/// Which tiles are laid out. As long as it stays the same, tiles do not need to be requested
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRange {
    pub start_x: i64,
    pub start_y: i64,
    pub count_x: u32,
    pub count_y: u32,
    pub zoom: u8,
}

impl TileRange {
    /// Grid indices of all tiles in the range, row by row. Indices may be outside of the world.
    pub fn indices(&self) -> impl Iterator<Item = (i64, i64)> + use<> {
        let TileRange {
            start_x,
            start_y,
            count_x,
            count_y,
            ..
        } = *self;

        (0..count_y as i64)
            .flat_map(move |j| (0..count_x as i64).map(move |i| (start_x + i, start_y + j)))
    }
}

/// Placement of the tile grid on the surface, computed for every redraw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileOrigin {
    /// Index of the top-left tile.
    pub start_x: i64,
    pub start_y: i64,

    /// Pixel position of the top-left corner of the top-left tile.
    pub origin_x: f64,
    pub origin_y: f64,

    pub count_x: u32,
    pub count_y: u32,
    pub zoom: u8,
    pub tile_size: u32,
}

impl TileOrigin {
    pub fn compute(
        center: Position,
        zoom: u8,
        size: SurfaceSize,
        pan: Vec2,
        options: &MapOptions,
    ) -> Self {
        let tile_size = options.tile_size.max(1);
        let ts = tile_size as f64;

        let count_x = size.width / tile_size + options.tile_slack;
        let count_y = size.height / tile_size + options.tile_slack;

        let exact = to_tile(center, zoom);

        let start_x = (exact.x - count_x as f64 / 2.).floor() as i64;
        let start_y = (exact.y - count_y as f64 / 2.).floor() as i64;

        let (half_width, half_height) = size.half();
        let origin_x = half_width - (exact.x - start_x as f64) * ts + pan.x as f64;
        let origin_y = half_height - (exact.y - start_y as f64) * ts + pan.y as f64;

        Self {
            start_x,
            start_y,
            origin_x,
            origin_y,
            count_x,
            count_y,
            zoom,
            tile_size,
        }
    }

    pub fn range(&self) -> TileRange {
        TileRange {
            start_x: self.start_x,
            start_y: self.start_y,
            count_x: self.count_x,
            count_y: self.count_y,
            zoom: self.zoom,
        }
    }

    /// Exact pixel position of a geographical position.
    pub fn project_exact(&self, position: Position) -> (f64, f64) {
        let tile = to_tile(position, self.zoom);
        let ts = self.tile_size as f64;
        (
            self.origin_x + (tile.x - self.start_x as f64) * ts,
            self.origin_y + (tile.y - self.start_y as f64) * ts,
        )
    }

    pub fn project(&self, position: Position) -> Pos2 {
        let (x, y) = self.project_exact(position);
        pos2(x as f32, y as f32)
    }

    /// Project a (lon, lat) coordinate.
    pub fn project_coord(&self, coord: geo_types::Coord) -> Pos2 {
        self.project(coord.into())
    }

    /// Top-left pixel of the tile at the given grid index.
    pub fn tile_position(&self, x: i64, y: i64) -> Pos2 {
        let ts = self.tile_size as f64;
        pos2(
            (self.origin_x + (x - self.start_x) as f64 * ts) as f32,
            (self.origin_y + (y - self.start_y) as f64 * ts) as f32,
        )
    }

    /// Geographical position shown in the middle of the surface. Inverse of [`Self::compute`],
    /// including the pan.
    pub fn center(&self, size: SurfaceSize) -> Position {
        let ts = self.tile_size as f64;
        let (half_width, half_height) = size.half();

        to_position(
            TileCoord::new(
                self.start_x as f64 + (half_width - self.origin_x) / ts,
                self.start_y as f64 + (half_height - self.origin_y) / ts,
            ),
            self.zoom,
        )
    }
}

/// What part of the world is visible.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub center: Position,
    pub zoom: Zoom,
    pub size: SurfaceSize,

    /// Offset accumulated by dragging, not yet committed into `center`.
    pub pan: Vec2,

    pub tile_size: u32,
}

impl Viewport {
    pub fn new(center: Position, zoom: Zoom, size: SurfaceSize, tile_size: u32) -> Self {
        Self {
            center,
            zoom,
            size,
            pan: Vec2::ZERO,
            tile_size: tile_size.max(1),
        }
    }

    pub fn origin(&self, options: &MapOptions) -> TileOrigin {
        TileOrigin::compute(
            self.center,
            self.zoom.level(),
            self.size,
            self.pan,
            options,
        )
    }

    /// Geographical position under the given pixel, evaluated against the current center and
    /// zoom.
    pub fn canvas_to_position(&self, pixel: Pos2) -> Position {
        let ts = self.tile_size as f64;
        let (half_width, half_height) = self.size.half();

        let dx = (pixel.x - self.pan.x) as f64 - half_width;
        let dy = (pixel.y - self.pan.y) as f64 - half_height;

        let zoom = self.zoom.level();
        to_position(to_tile(self.center, zoom).offset(dx / ts, dy / ts), zoom)
    }

    /// Visible part of the world.
    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::from_corners(
            self.canvas_to_position(pos2(0., 0.)),
            self.canvas_to_position(pos2(self.size.width as f32, self.size.height as f32)),
        )
    }

    /// Move the center by the accumulated pan and reset it. Returns whether there was anything to
    /// commit.
    pub fn commit_pan(&mut self) -> bool {
        if self.pan == Vec2::ZERO {
            return false;
        }

        let ts = self.tile_size as f64;
        let zoom = self.zoom.level();
        let tile = to_tile(self.center, zoom);

        self.center = to_position(
            tile.offset(-self.pan.x as f64 / ts, -self.pan.y as f64 / ts),
            zoom,
        );
        self.pan = Vec2::ZERO;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::lat_lon;
    use approx::assert_relative_eq;
    use egui::vec2;

    fn viewport(width: u32, height: u32) -> Viewport {
        Viewport::new(
            lat_lon(38.9, -77.0),
            Zoom::try_from(15u8).unwrap(),
            SurfaceSize::new(width, height),
            256,
        )
    }

    #[test]
    fn tile_count_covers_the_surface() {
        let options = MapOptions::default();

        let origin = viewport(500, 300).origin(&options);
        assert_eq!(origin.count_x, 4);
        assert_eq!(origin.count_y, 4);

        // Whatever the center, the grid reaches beyond every edge.
        for lon in [-77.0, -76.9991, -76.9983, -76.9975] {
            let mut viewport = viewport(500, 300);
            viewport.center = lat_lon(38.9, lon);
            let origin = viewport.origin(&options);
            let right = origin.origin_x + (origin.count_x * origin.tile_size) as f64;

            assert!(origin.origin_x <= 0.);
            assert!(right >= 500.);
        }
    }

    #[test]
    fn center_projects_to_the_middle_of_the_surface() {
        let viewport = viewport(500, 400);
        let origin = viewport.origin(&MapOptions::default());

        let pixel = origin.project(viewport.center);
        assert!((pixel.x - 250.).abs() < 1.);
        assert!((pixel.y - 200.).abs() < 1.);
    }

    #[test]
    fn recomputing_the_center_does_not_drift() {
        let options = MapOptions::default();
        let mut viewport = viewport(640, 480);

        viewport.center = viewport.origin(&options).center(viewport.size);
        let first = viewport.center;

        viewport.center = viewport.origin(&options).center(viewport.size);
        assert_relative_eq!(viewport.center.x(), first.x(), epsilon = 1e-9);
        assert_relative_eq!(viewport.center.y(), first.y(), epsilon = 1e-9);
        assert_relative_eq!(first.y(), 38.9, epsilon = 1e-9);
    }

    #[test]
    fn dragging_right_moves_center_west() {
        let mut viewport = viewport(500, 500);
        viewport.pan = vec2(100., 0.);

        assert!(viewport.commit_pan());
        assert!(viewport.center.x() < -77.0);
        assert_relative_eq!(viewport.center.y(), 38.9, epsilon = 1e-9);
        assert_eq!(viewport.pan, Vec2::ZERO);

        // Nothing left to commit.
        assert!(!viewport.commit_pan());
    }

    #[test]
    fn origin_center_agrees_with_commit() {
        let options = MapOptions::default();
        let mut viewport = viewport(500, 500);
        viewport.pan = vec2(37., -12.);

        let from_origin = viewport.origin(&options).center(viewport.size);
        viewport.commit_pan();

        assert_relative_eq!(from_origin.x(), viewport.center.x(), epsilon = 1e-9);
        assert_relative_eq!(from_origin.y(), viewport.center.y(), epsilon = 1e-9);
    }

    #[test]
    fn canvas_to_position_reverses_projection() {
        let options = MapOptions::default();
        let viewport = viewport(500, 500);
        let origin = viewport.origin(&options);

        let position = viewport.canvas_to_position(pos2(100., 400.));
        let pixel = origin.project(position);

        assert_relative_eq!(pixel.x, 100., epsilon = 1e-3);
        assert_relative_eq!(pixel.y, 400., epsilon = 1e-3);
    }

    #[test]
    fn bounds_contain_the_center() {
        let viewport = viewport(500, 500);
        let bounds = viewport.bounds();

        assert!(bounds.contains(&viewport.center.0));
        assert!(bounds.min_lon < bounds.max_lon);
        assert!(bounds.min_lat < bounds.max_lat);
    }

    #[test]
    fn tile_range_indices_go_row_by_row() {
        let range = TileRange {
            start_x: -1,
            start_y: 5,
            count_x: 2,
            count_y: 2,
            zoom: 3,
        };

        assert_eq!(
            range.indices().collect::<Vec<_>>(),
            vec![(-1, 5), (0, 5), (-1, 6), (0, 6)]
        );
    }
}
