//! Retained display list the layers draw into, and which the widget paints every frame.

use std::fmt;
use std::sync::Arc;

use egui::{Color32, Pos2, Rect, Stroke, Vec2, vec2};
use image::RgbaImage;

use crate::style::{CapStyle, JoinStyle};
use crate::tiles::{Tile, TileId, TileKind};

/// Identifies everything drawn for a single feature of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureTag {
    pub layer: String,
    pub sequence_index: usize,
}

impl fmt::Display for FeatureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature:{}:{}", self.layer, self.sequence_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Tile(TileId),

    /// Status text and the like, redrawn with every redraw.
    Overlay,

    Feature(FeatureTag),
    Label(FeatureTag),
}

impl Tag {
    pub fn feature(&self) -> Option<&FeatureTag> {
        match self {
            Tag::Feature(tag) | Tag::Label(tag) => Some(tag),
            Tag::Tile(_) | Tag::Overlay => None,
        }
    }

    /// Name of the layer the primitive was drawn by.
    pub fn layer(&self) -> Option<&str> {
        self.feature().map(|tag| tag.layer.as_str())
    }
}

/// Handle of a primitive in the [`Scene`], valid until it is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub size: f32,
    pub color: Color32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            size: 10.,
            color: Color32::BLACK,
        }
    }
}

/// How a polyline is stroked.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStroke {
    pub stroke: Stroke,
    pub dash: Option<Vec<f32>>,
    pub cap: CapStyle,
    pub join: JoinStyle,
}

impl From<Stroke> for LineStroke {
    fn from(stroke: Stroke) -> Self {
        Self {
            stroke,
            dash: None,
            cap: CapStyle::Butt,
            join: JoinStyle::Miter,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Primitive {
    Circle {
        center: Pos2,
        radius: f32,
        fill: Option<Color32>,
        outline: Option<Stroke>,
    },
    Polyline {
        points: Vec<Pos2>,
        stroke: LineStroke,
    },
    /// Filled convex polygon, such as an arrow head.
    Polygon { points: Vec<Pos2>, fill: Color32 },
    Image { min: Pos2, image: Arc<RgbaImage> },
    Tile {
        tile_id: TileId,
        min: Pos2,
        size: f32,
        tile: Tile,
    },
    Text {
        /// Top-left corner of the text.
        pos: Pos2,
        text: String,
        style: TextStyle,
    },
    Rect {
        rect: Rect,
        fill: Option<Color32>,
        outline: Option<Stroke>,
    },
}

impl Primitive {
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Primitive::Circle { center, .. } => *center += delta,
            Primitive::Polyline { points, .. } | Primitive::Polygon { points, .. } => {
                points.iter_mut().for_each(|point| *point += delta);
            }
            Primitive::Image { min, .. } | Primitive::Tile { min, .. } => *min += delta,
            Primitive::Text { pos, .. } => *pos += delta,
            Primitive::Rect { rect, .. } => *rect = rect.translate(delta),
        }
    }
}

/// Area which resolves to a feature when clicked or hovered.
#[derive(Debug, Clone, PartialEq)]
pub enum HitRegion {
    Circle { center: Pos2, radius: f32 },
    Polyline { points: Vec<Pos2>, width: f32 },

    /// Rings of a polygon, the area inside an odd number of rings belongs to it.
    Polygon { rings: Vec<Vec<Pos2>> },

    Rect(Rect),
}

/// Lines thinner than this are still easy to point at.
const MIN_LINE_HIT_WIDTH: f32 = 6.;

impl HitRegion {
    pub fn contains(&self, pos: Pos2) -> bool {
        match self {
            HitRegion::Circle { center, radius } => center.distance(pos) <= radius.max(1.),
            HitRegion::Polyline { points, width } => {
                let reach = width.max(MIN_LINE_HIT_WIDTH) / 2.;
                points
                    .windows(2)
                    .any(|segment| distance_to_segment(pos, segment[0], segment[1]) <= reach)
            }
            HitRegion::Polygon { rings } => {
                rings.iter().filter(|ring| ring_contains(ring, pos)).count() % 2 == 1
            }
            HitRegion::Rect(rect) => rect.contains(pos),
        }
    }

    fn translate(&mut self, delta: Vec2) {
        match self {
            HitRegion::Circle { center, .. } => *center += delta,
            HitRegion::Polyline { points, .. } => {
                points.iter_mut().for_each(|point| *point += delta);
            }
            HitRegion::Polygon { rings } => rings
                .iter_mut()
                .flatten()
                .for_each(|point| *point += delta),
            HitRegion::Rect(rect) => *rect = rect.translate(delta),
        }
    }
}

fn distance_to_segment(pos: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq == 0. {
        return pos.distance(a);
    }
    let t = ((pos - a).dot(ab) / length_sq).clamp(0., 1.);
    pos.distance(a + ab * t)
}

/// Ray casting, the ring does not need to be closed explicitly.
fn ring_contains(ring: &[Pos2], pos: Pos2) -> bool {
    let mut inside = false;
    let mut previous = match ring.last() {
        Some(last) => *last,
        None => return false,
    };

    for &current in ring {
        if (current.y > pos.y) != (previous.y > pos.y) {
            let x = previous.x + (pos.y - previous.y) / (current.y - previous.y) * (current.x - previous.x);
            if pos.x < x {
                inside = !inside;
            }
        }
        previous = current;
    }

    inside
}

/// Size of a text on the surface.
pub trait TextMeasure {
    fn measure(&self, text: &str, style: &TextStyle) -> Vec2;
}

/// Estimates text size from the font size alone. Good enough when no real fonts are at hand, such
/// as in headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMetrics;

impl TextMeasure for ApproximateMetrics {
    fn measure(&self, text: &str, style: &TextStyle) -> Vec2 {
        let widest_line = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let lines = text.lines().count().max(1);
        vec2(
            widest_line as f32 * style.size * 0.6,
            lines as f32 * style.size * 1.2,
        )
    }
}

/// Drawing primitives the map is made of.
pub trait Surface {
    fn circle(
        &mut self,
        tag: Tag,
        center: Pos2,
        radius: f32,
        fill: Option<Color32>,
        outline: Option<Stroke>,
    ) -> PrimitiveId;

    fn polyline(&mut self, tag: Tag, points: Vec<Pos2>, stroke: LineStroke) -> PrimitiveId;

    fn polygon(&mut self, tag: Tag, points: Vec<Pos2>, fill: Color32) -> PrimitiveId;

    /// Raster with its top-left corner at `min`.
    fn image(&mut self, tag: Tag, min: Pos2, image: RgbaImage) -> PrimitiveId;

    fn tile(&mut self, tile_id: TileId, min: Pos2, size: f32, tile: Tile) -> PrimitiveId;

    /// Text with its top-left corner at `pos`. Returns the area it takes.
    fn text(&mut self, tag: Tag, pos: Pos2, text: &str, style: &TextStyle) -> (PrimitiveId, Rect);

    fn rect(
        &mut self,
        tag: Tag,
        rect: Rect,
        fill: Option<Color32>,
        outline: Option<Stroke>,
    ) -> PrimitiveId;

    /// Move a primitive just beneath another one.
    fn lower(&mut self, id: PrimitiveId, below: PrimitiveId);

    /// Remove every primitive, and hit region, with a matching tag. Returns how many primitives
    /// were removed.
    fn remove(&mut self, matching: &dyn Fn(&Tag) -> bool) -> usize;

    fn register_hit(&mut self, tag: FeatureTag, region: HitRegion);
}

#[derive(Debug, Clone)]
pub struct ScenePrimitive {
    pub id: PrimitiveId,
    pub tag: Tag,
    pub primitive: Primitive,
}

/// [`Surface`] which just remembers what was drawn, in painting order.
pub struct Scene {
    primitives: Vec<ScenePrimitive>,
    hits: Vec<(FeatureTag, HitRegion)>,
    next_id: u64,
    measure: Box<dyn TextMeasure>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Box::new(ApproximateMetrics))
    }
}

impl Scene {
    pub fn new(measure: Box<dyn TextMeasure>) -> Self {
        Self {
            primitives: Vec::new(),
            hits: Vec::new(),
            next_id: 0,
            measure,
        }
    }

    pub fn set_text_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.measure = measure;
    }

    pub fn measure_text(&self, text: &str, style: &TextStyle) -> Vec2 {
        self.measure.measure(text, style)
    }

    /// Everything drawn, bottom first.
    pub fn primitives(&self) -> &[ScenePrimitive] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
        self.hits.clear();
    }

    /// Move everything but the overlay, including the hit regions.
    pub fn translate(&mut self, delta: Vec2) {
        self.primitives
            .iter_mut()
            .filter(|p| p.tag != Tag::Overlay)
            .for_each(|p| p.primitive.translate(delta));
        self.hits
            .iter_mut()
            .for_each(|(_, region)| region.translate(delta));
    }

    /// Move the tiles only.
    pub fn translate_tiles(&mut self, delta: Vec2) {
        self.primitives
            .iter_mut()
            .filter(|p| matches!(p.tag, Tag::Tile(_)))
            .for_each(|p| p.primitive.translate(delta));
    }

    /// Swap the raster in the slot of `tile_id`, keeping its place. Returns whether there was such
    /// slot.
    pub fn replace_tile(&mut self, tile_id: TileId, new_tile: Tile) -> bool {
        let mut replaced = false;
        for p in &mut self.primitives {
            if let Primitive::Tile {
                tile_id: slot,
                tile,
                ..
            } = &mut p.primitive
                && *slot == tile_id
            {
                *tile = new_tile.clone();
                replaced = true;
            }
        }
        replaced
    }

    /// Tiles currently laid out, in painting order.
    pub fn tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.primitives.iter().filter_map(|p| match p.tag {
            Tag::Tile(tile_id) => Some(tile_id),
            _ => None,
        })
    }

    /// Tiles which still show the loading placeholder, in painting order.
    pub fn loading_tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.primitives.iter().filter_map(|p| match &p.primitive {
            Primitive::Tile { tile_id, tile, .. } if tile.kind() == TileKind::Loading => {
                Some(*tile_id)
            }
            _ => None,
        })
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&ScenePrimitive> {
        self.primitives.iter().find(|p| p.id == id)
    }

    /// Topmost feature at the given position.
    pub fn hit_test(&self, pos: Pos2) -> Option<&FeatureTag> {
        self.hits
            .iter()
            .rev()
            .find(|(_, region)| region.contains(pos))
            .map(|(tag, _)| tag)
    }

    fn push(&mut self, tag: Tag, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id += 1;
        self.primitives.push(ScenePrimitive { id, tag, primitive });
        id
    }
}

impl Surface for Scene {
    fn circle(
        &mut self,
        tag: Tag,
        center: Pos2,
        radius: f32,
        fill: Option<Color32>,
        outline: Option<Stroke>,
    ) -> PrimitiveId {
        self.push(
            tag,
            Primitive::Circle {
                center,
                radius,
                fill,
                outline,
            },
        )
    }

    fn polyline(&mut self, tag: Tag, points: Vec<Pos2>, stroke: LineStroke) -> PrimitiveId {
        self.push(tag, Primitive::Polyline { points, stroke })
    }

    fn polygon(&mut self, tag: Tag, points: Vec<Pos2>, fill: Color32) -> PrimitiveId {
        self.push(tag, Primitive::Polygon { points, fill })
    }

    fn image(&mut self, tag: Tag, min: Pos2, image: RgbaImage) -> PrimitiveId {
        self.push(
            tag,
            Primitive::Image {
                min,
                image: Arc::new(image),
            },
        )
    }

    fn tile(&mut self, tile_id: TileId, min: Pos2, size: f32, tile: Tile) -> PrimitiveId {
        self.push(
            Tag::Tile(tile_id),
            Primitive::Tile {
                tile_id,
                min,
                size,
                tile,
            },
        )
    }

    fn text(&mut self, tag: Tag, pos: Pos2, text: &str, style: &TextStyle) -> (PrimitiveId, Rect) {
        let size = self.measure.measure(text, style);
        let id = self.push(
            tag,
            Primitive::Text {
                pos,
                text: text.to_owned(),
                style: style.clone(),
            },
        );
        (id, Rect::from_min_size(pos, size))
    }

    fn rect(
        &mut self,
        tag: Tag,
        rect: Rect,
        fill: Option<Color32>,
        outline: Option<Stroke>,
    ) -> PrimitiveId {
        self.push(
            tag,
            Primitive::Rect {
                rect,
                fill,
                outline,
            },
        )
    }

    fn lower(&mut self, id: PrimitiveId, below: PrimitiveId) {
        let Some(from) = self.primitives.iter().position(|p| p.id == id) else {
            return;
        };
        let primitive = self.primitives.remove(from);

        match self.primitives.iter().position(|p| p.id == below) {
            Some(to) => self.primitives.insert(to, primitive),
            None => self.primitives.insert(from, primitive),
        }
    }

    fn remove(&mut self, matching: &dyn Fn(&Tag) -> bool) -> usize {
        let before = self.primitives.len();
        self.primitives.retain(|p| !matching(&p.tag));
        self.hits
            .retain(|(tag, _)| !matching(&Tag::Feature(tag.clone())));
        before - self.primitives.len()
    }

    fn register_hit(&mut self, tag: FeatureTag, region: HitRegion) {
        self.hits.push((tag, region));
    }
}
