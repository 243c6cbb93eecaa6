use std::time::Instant;

use egui::{Color32, Pos2, Rect, Vec2, pos2, vec2};
use serde_json::Value;

use crate::controller::{Controller, Effect, State};
use crate::feature::{FeatureFilter, FeatureLoader};
use crate::layer::{Interaction, Layer, layers_from_geojson};
use crate::options::MapOptions;
use crate::position::Position;
use crate::scene::{FeatureTag, Scene, Surface, Tag, TextMeasure, TextStyle};
use crate::tiles::{TileId, TileKind, Tiles, request_tile};
use crate::viewport::{SurfaceSize, TileOrigin, Viewport};
use crate::zoom::{InvalidZoom, Zoom};

/// Distance of the status text from the corner of the surface.
const STATUS_INSET: f32 = 5.;

/// How many loading slots are asked for their tile again on a single refresh.
const MAX_TILES_ASKED_AGAIN: usize = 32;

/// State of the map which must persist between frames: the viewport, the layers, and the scene
/// drawn out of them.
pub struct MapMemory {
    viewport: Viewport,
    options: MapOptions,
    controller: Controller,
    loader: FeatureLoader,
    layers: Vec<Layer>,
    scene: Scene,

    /// Origin of the last redraw.
    drawn: Option<TileOrigin>,

    /// How much the scene was moved by dragging since the last redraw.
    shifted: Vec2,

    hovered: Option<FeatureTag>,
    redraw_pending: bool,
}

impl MapMemory {
    pub fn new(center: Position, zoom: Zoom, options: MapOptions) -> Self {
        Self {
            viewport: Viewport::new(center, zoom, SurfaceSize::default(), options.tile_size),
            controller: Controller::new(&options),
            options,
            loader: FeatureLoader::new(),
            layers: Vec::new(),
            scene: Scene::default(),
            drawn: None,
            shifted: Vec2::ZERO,
            hovered: None,
            redraw_pending: true,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn center(&self) -> Position {
        self.viewport.center
    }

    pub fn zoom(&self) -> Zoom {
        self.viewport.zoom
    }

    /// Center exactly at the given position. Takes effect with the next redraw.
    pub fn center_at(&mut self, position: Position) {
        self.viewport.center = position;
        self.viewport.pan = Vec2::ZERO;
        self.redraw_pending = true;
    }

    /// Set exact zoom level. Takes effect with the next redraw.
    pub fn set_zoom(&mut self, zoom: u8) -> Result<(), InvalidZoom> {
        let zoom = Zoom::try_from(zoom)?;
        if zoom < self.options.min_zoom || zoom > self.options.max_zoom {
            return Err(InvalidZoom);
        }
        self.viewport.zoom = zoom;
        self.redraw_pending = true;
        Ok(())
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn set_text_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.scene.set_text_measure(measure);
    }

    /// Whether something changed and [`Self::redraw`] should be called.
    pub fn needs_redraw(&self) -> bool {
        self.redraw_pending
    }

    pub fn state(&self) -> State {
        self.controller.state()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    /// Changes to the layer's features show up with the next redraw.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.redraw_pending = true;
        self.layers.iter_mut().find(|layer| layer.name() == name)
    }

    /// Add a layer on top of the others.
    pub fn add_layer(&mut self, layer: Layer) -> &mut Layer {
        self.redraw_pending = true;
        self.layers.push(layer);
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }

    pub fn remove_layer(&mut self, name: &str) -> Option<Layer> {
        let index = self.layers.iter().position(|layer| layer.name() == name)?;
        self.scene.remove(&|tag| tag.layer() == Some(name));
        Some(self.layers.remove(index))
    }

    /// Load GeoJSON into the `polygons`, `lines` and `points` layers, creating those which do not
    /// exist yet. Features are numbered after the ones loaded before.
    pub fn add_geojson(&mut self, geojson: &Value, label_key: Option<&str>) {
        for loaded in layers_from_geojson(&mut self.loader, geojson, label_key) {
            match self.layers.iter_mut().find(|layer| layer.name() == loaded.name()) {
                Some(existing) => {
                    for feature in loaded.features().iter().cloned() {
                        if let Err(err) = existing.add_feature(feature) {
                            log::warn!("{err}");
                        }
                    }
                }
                None => self.layers.push(loaded),
            }
        }
        self.redraw_pending = true;
    }

    /// Remove matching features of a layer, together with everything drawn for the layer, and
    /// draw the rest again. Returns how many features were removed.
    pub fn remove_features_and_redraw(
        &mut self,
        layer: &str,
        filter: &FeatureFilter,
        tiles: &mut dyn Tiles,
    ) -> usize {
        let Some(found) = self.layers.iter_mut().find(|l| l.name() == layer) else {
            return 0;
        };

        let removed = found.remove_features(filter);
        self.scene.remove(&|tag| tag.layer() == Some(layer));
        self.redraw(tiles);
        removed
    }

    /// Geographical position under the given pixel of the surface.
    pub fn canvas_to_position(&self, pixel: Pos2) -> Position {
        self.viewport.canvas_to_position(pixel)
    }

    /// Pixel position of the given geographical position, as it is drawn now.
    pub fn project(&self, position: Position) -> Pos2 {
        self.viewport.origin(&self.options).project(position)
    }

    pub fn drag_start(&mut self) {
        self.controller.drag_start();
    }

    /// Move what is drawn along with the pointer.
    pub fn drag_move(&mut self, delta: Vec2) {
        if let Effect::Shift(delta) = self.controller.drag_move(&mut self.viewport, delta) {
            self.scene.translate(delta);
            self.shifted += delta;
        }
    }

    pub fn drag_end(&mut self, tiles: &mut dyn Tiles) {
        let effect = self.controller.drag_end(&mut self.viewport);
        self.apply(effect, tiles);
    }

    /// Zoom in (positive) or out (negative) by a number of levels.
    pub fn zoom_by(&mut self, steps: i32, tiles: &mut dyn Tiles) {
        let effect = self.controller.zoom(&mut self.viewport, steps);
        self.apply(effect, tiles);
    }

    /// Surface size reported by the host. The very first size is taken immediately, later ones
    /// are debounced, see [`Self::poll`].
    pub fn resize(&mut self, size: SurfaceSize, now: Instant) {
        if self.viewport.size.is_degenerate() && !size.is_degenerate() {
            self.viewport.size = size;
            self.redraw_pending = true;
        } else {
            self.controller.resize(&self.viewport, size, now);
        }
    }

    /// Apply what is due: a debounced resize, or a redraw which could not happen before. Returns
    /// whether the map was redrawn.
    pub fn poll(&mut self, tiles: &mut dyn Tiles, now: Instant) -> bool {
        if self.controller.poll(&mut self.viewport, now) == Effect::Redraw {
            self.redraw_pending = true;
        }

        if self.redraw_pending && self.controller.state() != State::Dragging {
            self.redraw(tiles);
            !self.redraw_pending
        } else {
            false
        }
    }

    /// When [`Self::poll`] should be called next, if there is something waiting.
    pub fn next_poll(&self) -> Option<Instant> {
        self.controller.resize_deadline()
    }

    fn apply(&mut self, effect: Effect, tiles: &mut dyn Tiles) {
        match effect {
            Effect::Nothing => {}
            Effect::Shift(delta) => {
                self.scene.translate(delta);
                self.shifted += delta;
            }
            Effect::Redraw => self.redraw(tiles),
        }
    }

    /// Draw the tiles, the status overlay and the layers, in this order. Tiles are requested only
    /// if the range of tiles changed since the previous redraw.
    pub fn redraw(&mut self, tiles: &mut dyn Tiles) {
        if self.viewport.size.is_degenerate() {
            log::debug!("Surface is not laid out yet, redrawing later.");
            self.redraw_pending = true;
            return;
        }

        self.viewport.commit_pan();
        let origin = self.viewport.origin(&self.options);

        match self.drawn {
            Some(drawn) if drawn.range() == origin.range() => {
                log::debug!("Tile range unchanged, not requesting tiles.");
                self.scene.remove(&|tag| !matches!(tag, Tag::Tile(_)));

                let moved = vec2(
                    (origin.origin_x - drawn.origin_x) as f32,
                    (origin.origin_y - drawn.origin_y) as f32,
                );
                self.scene.translate_tiles(moved - self.shifted);
            }
            _ => {
                self.scene.clear();
                self.place_tiles(tiles, &origin);
            }
        }

        self.drawn = Some(origin);
        self.shifted = Vec2::ZERO;

        // Keep the center exactly where the middle of the surface is.
        self.viewport.center = origin.center(self.viewport.size);

        if self.options.status_overlay {
            self.draw_status();
        }

        let bounds = self.viewport.bounds();
        let clip = Rect::from_min_size(
            Pos2::ZERO,
            vec2(
                self.viewport.size.width as f32,
                self.viewport.size.height as f32,
            ),
        );

        for layer in &self.layers {
            layer.draw(&mut self.scene, &origin, &bounds, clip);
        }

        self.redraw_pending = false;
    }

    /// Swap the placeholders of tiles which arrived since the last time. Slots still loading are
    /// asked for again, as the source might not have been able to take their request before.
    /// Returns whether anything changed.
    pub fn refresh_tiles(&mut self, tiles: &mut dyn Tiles) -> bool {
        let mut refreshed = false;
        for tile_id in tiles.updated() {
            if let Some(tile) = tiles.at(tile_id) {
                refreshed |= self.scene.replace_tile(tile_id, tile);
            }
        }

        let loading: Vec<TileId> = self
            .scene
            .loading_tile_ids()
            .take(MAX_TILES_ASKED_AGAIN)
            .collect();

        for tile_id in loading {
            if let Some(tile) = tiles.at(tile_id)
                && tile.kind() != TileKind::Loading
            {
                refreshed |= self.scene.replace_tile(tile_id, tile);
            }
        }

        refreshed
    }

    fn place_tiles(&mut self, tiles: &mut dyn Tiles, origin: &TileOrigin) {
        let range = origin.range();

        for (x, y) in range.indices() {
            match request_tile(tiles, range.zoom, x, y) {
                Ok(Some(tile)) => {
                    if let Some(tile_id) = TileId::checked(range.zoom, x, y) {
                        self.scene.tile(
                            tile_id,
                            origin.tile_position(x, y),
                            origin.tile_size as f32,
                            tile,
                        );
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    log::error!("Cannot lay out tiles at zoom {}: {err}", range.zoom);
                    return;
                }
            }
        }
    }

    fn draw_status(&mut self) {
        let text = format!(
            "Lat: {:.5}, Lon: {:.5}, Zoom: {}",
            self.viewport.center.y(),
            self.viewport.center.x(),
            self.viewport.zoom
        );
        let style = TextStyle::default();
        let size = self.scene.measure_text(&text, &style);

        let pos = pos2(
            self.viewport.size.width as f32 - STATUS_INSET - size.x,
            self.viewport.size.height as f32 - STATUS_INSET - size.y,
        );

        let (text_id, bounds) = self.scene.text(Tag::Overlay, pos, &text, &style);
        let background = self.scene.rect(
            Tag::Overlay,
            bounds.expand(2.),
            Some(Color32::from_white_alpha(200)),
            None,
        );
        self.scene.lower(background, text_id);
    }

    /// Run the handlers of the topmost feature at `pos`. Returns whether there was any.
    pub fn interact(&mut self, interaction: Interaction, pos: Pos2) -> bool {
        let Some(tag) = self.scene.hit_test(pos).cloned() else {
            return false;
        };
        self.dispatch(interaction, &tag)
    }

    /// Track the pointer, running hover handlers when it enters or leaves a feature.
    pub fn hover(&mut self, pos: Option<Pos2>) {
        let now = pos.and_then(|pos| self.scene.hit_test(pos)).cloned();
        if now == self.hovered {
            return;
        }

        if let Some(left) = self.hovered.take() {
            self.dispatch(Interaction::HoverLeave, &left);
        }
        if let Some(entered) = &now {
            self.dispatch(Interaction::HoverEnter, entered);
        }
        self.hovered = now;
    }

    pub fn hovered(&self) -> Option<&FeatureTag> {
        self.hovered.as_ref()
    }

    fn dispatch(&mut self, interaction: Interaction, tag: &FeatureTag) -> bool {
        self.layers
            .iter_mut()
            .find(|layer| layer.name() == tag.layer)
            .is_some_and(|layer| layer.dispatch(interaction, tag.sequence_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureFamily;
    use crate::position::lat_lon;
    use crate::scene::Primitive;
    use crate::tiles::Tile;
    use approx::assert_relative_eq;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Remembers what is asked for. Every tile is a placeholder until it is in `arrived`.
    #[derive(Default)]
    struct CountingTiles {
        requested: Vec<TileId>,
        arrived: Vec<TileId>,
    }

    impl Tiles for CountingTiles {
        fn at(&mut self, tile_id: TileId) -> Option<Tile> {
            self.requested.push(tile_id);
            Some(if self.arrived.contains(&tile_id) {
                Tile::missing()
            } else {
                Tile::loading()
            })
        }

        fn updated(&mut self) -> Vec<TileId> {
            self.arrived.clone()
        }
    }

    /// Takes only a few requests at a time, like a full request queue. Taken requests complete
    /// with the next `updated`, as missing tiles.
    struct BusyTiles {
        capacity: usize,
        queued: Vec<TileId>,
        done: Vec<TileId>,
    }

    impl Tiles for BusyTiles {
        fn at(&mut self, tile_id: TileId) -> Option<Tile> {
            if self.done.contains(&tile_id) {
                return Some(Tile::missing());
            }

            if !self.queued.contains(&tile_id) && self.queued.len() < self.capacity {
                self.queued.push(tile_id);
            }
            Some(Tile::loading())
        }

        fn updated(&mut self) -> Vec<TileId> {
            let arrived = std::mem::take(&mut self.queued);
            self.done.extend(&arrived);
            arrived
        }
    }

    fn memory() -> MapMemory {
        let mut memory = MapMemory::new(
            lat_lon(38.9, -77.0),
            Zoom::try_from(15u8).unwrap(),
            MapOptions::default(),
        );
        memory.resize(SurfaceSize::new(500, 500), Instant::now());
        memory
    }

    fn point(lon: f64, lat: f64, label: &str) -> serde_json::Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [lon, lat] },
            "properties": { "label": label },
        })
    }

    #[test]
    fn unchanged_tile_range_is_not_requested_again() {
        let mut memory = memory();
        let mut tiles = CountingTiles::default();

        memory.redraw(&mut tiles);
        let first = tiles.requested.len();
        assert_eq!(first, 16);

        memory.redraw(&mut tiles);
        assert_eq!(tiles.requested.len(), first);
        assert_eq!(memory.scene().tile_ids().count(), 16);
    }

    #[test]
    fn repeated_redraws_do_not_drift() {
        let mut memory = memory();
        let mut tiles = CountingTiles::default();

        memory.redraw(&mut tiles);
        let first = memory.center();
        memory.redraw(&mut tiles);

        assert_relative_eq!(memory.center().x(), first.x(), epsilon = 1e-9);
        assert_relative_eq!(memory.center().y(), first.y(), epsilon = 1e-9);
    }

    #[test]
    fn feature_at_the_center_is_drawn_in_the_middle() {
        let mut memory = memory();
        memory.add_geojson(&point(-77.0, 38.9, "here"), None);
        memory.redraw(&mut CountingTiles::default());

        let marker = memory
            .scene()
            .primitives()
            .iter()
            .find_map(|p| match p.primitive {
                Primitive::Circle { center, .. } => Some(center),
                _ => None,
            })
            .unwrap();

        assert!((marker.x - 250.).abs() < 1.);
        assert!((marker.y - 250.).abs() < 1.);
    }

    #[test]
    fn tiles_are_beneath_everything_else() {
        let mut memory = memory();
        let mut tiles = CountingTiles::default();
        memory.add_geojson(&point(-77.0, 38.9, "here"), None);

        memory.redraw(&mut tiles);
        memory.drag_start();
        memory.drag_move(vec2(3., 0.));
        memory.drag_end(&mut tiles);

        let tags: Vec<_> = memory.scene().primitives().iter().map(|p| &p.tag).collect();
        let last_tile = tags.iter().rposition(|tag| matches!(tag, Tag::Tile(_))).unwrap();
        let first_other = tags.iter().position(|tag| !matches!(tag, Tag::Tile(_))).unwrap();
        assert!(last_tile < first_other);
    }

    #[test]
    fn small_drag_keeps_tiles_and_moves_them() {
        let mut memory = memory();
        let mut tiles = CountingTiles::default();

        memory.redraw(&mut tiles);
        let requested = tiles.requested.len();
        let tile_position = |memory: &MapMemory| {
            memory
                .scene()
                .primitives()
                .iter()
                .find_map(|p| match p.primitive {
                    Primitive::Tile { min, .. } => Some(min),
                    _ => None,
                })
                .unwrap()
        };
        let before = tile_position(&memory);

        memory.drag_start();
        memory.drag_move(vec2(0.5, 0.));
        assert_eq!(tile_position(&memory), before + vec2(0.5, 0.));
        memory.drag_end(&mut tiles);

        // Center of the test viewport is far enough from tile borders.
        assert_eq!(tiles.requested.len(), requested);
        assert!((tile_position(&memory).x - (before.x + 0.5)).abs() < 1e-3);
        assert_eq!(memory.viewport().pan, Vec2::ZERO);
    }

    #[test]
    fn status_overlay_sits_in_the_bottom_right_corner() {
        let mut memory = memory();
        memory.redraw(&mut CountingTiles::default());

        let (pos, text) = memory
            .scene()
            .primitives()
            .iter()
            .find_map(|p| match (&p.tag, &p.primitive) {
                (Tag::Overlay, Primitive::Text { pos, text, .. }) => Some((*pos, text.clone())),
                _ => None,
            })
            .unwrap();

        assert!(text.starts_with("Lat: 38.90000, Lon: -77.00000, Zoom: 15"));
        let size = memory.scene().measure_text(&text, &TextStyle::default());
        assert_relative_eq!(pos.x + size.x, 495., epsilon = 1e-3);
        assert_relative_eq!(pos.y + size.y, 495., epsilon = 1e-3);
    }

    #[test]
    fn redraw_waits_for_the_surface() {
        let mut memory = MapMemory::new(
            lat_lon(0., 0.),
            Zoom::try_from(3u8).unwrap(),
            MapOptions::default(),
        );
        let mut tiles = CountingTiles::default();

        memory.redraw(&mut tiles);
        assert!(tiles.requested.is_empty());
        assert!(memory.needs_redraw());

        memory.resize(SurfaceSize::new(300, 200), Instant::now());
        assert!(memory.poll(&mut tiles, Instant::now()));
        assert!(!tiles.requested.is_empty());
        assert!(!memory.needs_redraw());
    }

    #[test]
    fn later_resizes_are_debounced() {
        let mut memory = memory();
        let mut tiles = CountingTiles::default();
        let start = Instant::now();
        assert!(memory.poll(&mut tiles, start));

        memory.resize(SurfaceSize::new(800, 600), start);
        assert!(!memory.poll(&mut tiles, start + Duration::from_millis(100)));
        assert_eq!(memory.viewport().size, SurfaceSize::new(500, 500));

        assert!(memory.poll(&mut tiles, start + Duration::from_millis(200)));
        assert_eq!(memory.viewport().size, SurfaceSize::new(800, 600));
    }

    #[test]
    fn arrived_tiles_replace_placeholders_in_place() {
        let mut memory = memory();
        let mut tiles = CountingTiles::default();
        memory.redraw(&mut tiles);

        let tile_id = memory.scene().tile_ids().next().unwrap();
        tiles.arrived.push(tile_id);

        assert!(memory.refresh_tiles(&mut tiles));
        let kind = memory
            .scene()
            .primitives()
            .iter()
            .find_map(|p| match &p.primitive {
                Primitive::Tile { tile_id: id, tile, .. } if *id == tile_id => Some(tile.kind()),
                _ => None,
            })
            .unwrap();
        assert_eq!(kind, crate::tiles::TileKind::Missing);
    }

    #[test]
    fn tiles_which_could_not_be_requested_are_asked_for_again() {
        let mut memory = MapMemory::new(
            lat_lon(38.9, -77.0),
            Zoom::try_from(15u8).unwrap(),
            MapOptions::default(),
        );
        memory.resize(SurfaceSize::new(1024, 768), Instant::now());
        let mut tiles = BusyTiles {
            capacity: 4,
            queued: Vec::new(),
            done: Vec::new(),
        };

        memory.redraw(&mut tiles);
        assert_eq!(memory.scene().loading_tile_ids().count(), 42);

        for _ in 0..20 {
            memory.refresh_tiles(&mut tiles);
        }

        assert_eq!(memory.scene().loading_tile_ids().count(), 0);
        assert_eq!(tiles.done.len(), 42);
    }

    #[test]
    fn click_reaches_the_handler() {
        let mut memory = memory();
        memory.add_geojson(&point(-77.0, 38.9, "here"), None);

        let clicks = Rc::new(Cell::new(0));
        let clicks_clone = Rc::clone(&clicks);
        memory
            .layer_mut("points")
            .unwrap()
            .on(Interaction::Click, move |_| clicks_clone.set(clicks_clone.get() + 1));

        memory.redraw(&mut CountingTiles::default());

        assert!(memory.interact(Interaction::Click, pos2(250., 250.)));
        assert!(!memory.interact(Interaction::Click, pos2(10., 10.)));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn hover_enters_and_leaves() {
        let mut memory = memory();
        memory.add_geojson(&point(-77.0, 38.9, "here"), None);

        let events = Rc::new(std::cell::RefCell::new(Vec::new()));
        let layer = memory.layer_mut("points").unwrap();
        for interaction in [Interaction::HoverEnter, Interaction::HoverLeave] {
            let events = Rc::clone(&events);
            layer.on(interaction, move |_| events.borrow_mut().push(interaction));
        }

        memory.redraw(&mut CountingTiles::default());

        memory.hover(Some(pos2(250., 250.)));
        memory.hover(Some(pos2(251., 250.)));
        assert!(memory.hovered().is_some());
        memory.hover(None);

        assert_eq!(
            *events.borrow(),
            vec![Interaction::HoverEnter, Interaction::HoverLeave]
        );
    }

    #[test]
    fn features_keep_load_order_across_loads() {
        let mut memory = memory();
        memory.add_geojson(&point(-77.0, 38.9, "a"), None);
        memory.add_geojson(&point(-77.0001, 38.9, "b"), None);
        memory.add_geojson(&point(-77.0002, 38.9, "c"), None);
        memory.redraw(&mut CountingTiles::default());

        let points = memory.layer("points").unwrap();
        let indices: Vec<_> = points.features().iter().map(|f| f.sequence_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(points.family(), FeatureFamily::Points);

        let drawn: Vec<_> = memory
            .scene()
            .primitives()
            .iter()
            .filter(|p| matches!(p.primitive, Primitive::Circle { .. }))
            .filter_map(|p| p.tag.feature().map(|tag| tag.sequence_index))
            .collect();
        assert_eq!(drawn, vec![0, 1, 2]);
    }

    #[test]
    fn removed_features_disappear() {
        let mut memory = memory();
        let mut tiles = CountingTiles::default();
        memory.add_geojson(&point(-77.0, 38.9, "a"), None);
        memory.add_geojson(&point(-77.0001, 38.9, "b"), None);
        memory.redraw(&mut tiles);

        let filter = FeatureFilter::default().with_property("label", "a");
        assert_eq!(memory.remove_features_and_redraw("points", &filter, &mut tiles), 1);

        let circles = memory
            .scene()
            .primitives()
            .iter()
            .filter(|p| matches!(p.primitive, Primitive::Circle { .. }))
            .count();
        assert_eq!(circles, 1);
        assert_eq!(memory.layer("points").unwrap().feature_count(), 1);
    }
}
