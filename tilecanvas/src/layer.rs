//! Groups of features drawn together, on top of the tiles.

use std::collections::HashMap;
use std::fmt;

use egui::{Pos2, Rect, Stroke, Vec2};
use geo_types::{Coord, Polygon};
use serde_json::Value;

use crate::feature::{Feature, FeatureFamily, FeatureFilter, FeatureLoader, Geometry};
use crate::label::draw_label;
use crate::mask::Mask;
use crate::position::GeoBounds;
use crate::scene::{FeatureTag, HitRegion, LineStroke, Surface, Tag};
use crate::style::{LabelStyle, LineStyle, PointStyle, ShapeStyle};
use crate::viewport::TileOrigin;

/// What the user can do to a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    Click,
    RightClick,
    DoubleClick,
    MiddleClick,
    HoverEnter,
    HoverLeave,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LayerError {
    #[error("layer '{layer}' holds {expected:?}, but the feature is {actual:?}")]
    WrongFamily {
        layer: String,
        expected: FeatureFamily,
        actual: FeatureFamily,
    },
}

type Handler = Box<dyn FnMut(&Feature)>;

/// Named, ordered collection of features of a single [`FeatureFamily`]. Features are drawn in the
/// order they were added, so the later ones end up on top.
pub struct Layer {
    name: String,
    family: FeatureFamily,
    features: Vec<Feature>,
    visible: bool,
    label_key: Option<String>,
    handlers: HashMap<Interaction, Vec<Handler>>,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("features", &self.features.len())
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

impl Layer {
    pub fn new(name: impl Into<String>, family: FeatureFamily) -> Self {
        Self {
            name: name.into(),
            family,
            features: Vec::new(),
            visible: true,
            label_key: None,
            handlers: HashMap::new(),
        }
    }

    /// Take label texts from this property instead of `label`.
    pub fn with_label_key(mut self, key: impl Into<String>) -> Self {
        self.label_key = Some(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> FeatureFamily {
        self.family
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn feature(&self, sequence_index: usize) -> Option<&Feature> {
        self.features
            .iter()
            .find(|feature| feature.sequence_index == sequence_index)
    }

    /// Append a feature. Features without geometry are accepted, and never drawn.
    pub fn add_feature(&mut self, feature: Feature) -> Result<(), LayerError> {
        match feature.family() {
            Some(actual) if actual != self.family => Err(LayerError::WrongFamily {
                layer: self.name.clone(),
                expected: self.family,
                actual,
            }),
            _ => {
                self.features.push(feature);
                Ok(())
            }
        }
    }

    pub fn clear_features(&mut self) {
        self.features.clear();
    }

    /// Remove features matching the filter. Returns how many were removed.
    pub fn remove_features(&mut self, filter: &FeatureFilter) -> usize {
        let before = self.features.len();
        self.features.retain(|feature| !filter.matches(feature));
        before - self.features.len()
    }

    /// Call `handler` whenever `interaction` happens to one of the features.
    pub fn on(
        &mut self,
        interaction: Interaction,
        handler: impl FnMut(&Feature) + 'static,
    ) -> &mut Self {
        self.handlers
            .entry(interaction)
            .or_default()
            .push(Box::new(handler));
        self
    }

    /// Run the handlers of the feature. Returns whether there was any.
    pub(crate) fn dispatch(&mut self, interaction: Interaction, sequence_index: usize) -> bool {
        let Some(handlers) = self.handlers.get_mut(&interaction) else {
            return false;
        };
        let Some(feature) = self
            .features
            .iter()
            .find(|feature| feature.sequence_index == sequence_index)
        else {
            return false;
        };

        for handler in handlers.iter_mut() {
            handler(feature);
        }
        !handlers.is_empty()
    }

    pub fn tag(&self, feature: &Feature) -> FeatureTag {
        FeatureTag {
            layer: self.name.clone(),
            sequence_index: feature.sequence_index,
        }
    }

    fn label_text(&self, feature: &Feature) -> Option<String> {
        feature
            .text_property(self.label_key.as_deref().unwrap_or("label"))
            .filter(|text| !text.is_empty())
    }

    /// Draw features which are at least partially within `bounds`. `clip` is the area of the
    /// surface.
    pub fn draw(
        &self,
        surface: &mut dyn Surface,
        origin: &TileOrigin,
        bounds: &GeoBounds,
        clip: Rect,
    ) {
        if !self.visible {
            return;
        }

        for feature in &self.features {
            let Some(geometry) = &feature.geometry else {
                continue;
            };

            if !feature
                .bounds()
                .is_some_and(|feature_bounds| feature_bounds.intersects(bounds))
            {
                continue;
            }

            let painter = FeaturePainter {
                surface: &mut *surface,
                origin,
                bounds,
                tag: self.tag(feature),
                feature,
                label: self.label_text(feature),
            };

            match geometry {
                Geometry::Point(point) => painter.points([&point.0]),
                Geometry::MultiPoint(points) => painter.points(points.0.iter().map(|p| &p.0)),
                Geometry::LineString(line) => painter.lines([&line.0[..]]),
                Geometry::MultiLineString(lines) => {
                    painter.lines(lines.0.iter().map(|line| &line.0[..]))
                }
                Geometry::Polygon(polygon) => painter.shapes([polygon], clip),
                Geometry::MultiPolygon(polygons) => painter.shapes(&polygons.0, clip),
            }
        }
    }
}

/// Draws a single feature.
struct FeaturePainter<'a> {
    surface: &'a mut dyn Surface,
    origin: &'a TileOrigin,
    bounds: &'a GeoBounds,
    tag: FeatureTag,
    feature: &'a Feature,
    label: Option<String>,
}

impl FeaturePainter<'_> {
    fn project(&self, coord: &Coord) -> Pos2 {
        self.origin.project_coord(*coord)
    }

    fn label(&mut self, anchor: Option<Pos2>, default_offset: Vec2) {
        if let (Some(anchor), Some(text)) = (anchor, &self.label) {
            let style = LabelStyle::from_properties(&self.feature.properties, default_offset);
            draw_label(self.surface, &self.tag, anchor, text, &style);
        }
    }

    /// Marker for every visible point, labeled at the rightmost one.
    fn points<'c>(mut self, coords: impl IntoIterator<Item = &'c Coord>) {
        let style = PointStyle::from_properties(&self.feature.properties);
        let outline = style.outline.map(|color| Stroke::new(1., color));
        let mut rightmost: Option<Pos2> = None;

        for coord in coords {
            if !self.bounds.contains(coord) {
                continue;
            }

            let center = self.project(coord);
            self.surface.circle(
                Tag::Feature(self.tag.clone()),
                center,
                style.radius,
                style.color,
                outline,
            );
            self.surface.register_hit(
                self.tag.clone(),
                HitRegion::Circle {
                    center,
                    radius: style.radius,
                },
            );

            if rightmost.is_none_or(|r| center.x > r.x) {
                rightmost = Some(center);
            }
        }

        self.label(rightmost, style.default_label_offset());
    }

    /// Polyline through the visible points of every sequence, labeled at the end of the last one.
    fn lines<'c>(mut self, sequences: impl IntoIterator<Item = &'c [Coord]>) {
        let style = LineStyle::from_properties(&self.feature.properties);
        let mut last_end = None;

        for sequence in sequences {
            let points: Vec<Pos2> = sequence
                .iter()
                .filter(|coord| self.bounds.contains(coord))
                .map(|coord| self.project(coord))
                .collect();

            if points.len() < 2 {
                continue;
            }

            let path = if style.smooth {
                smooth(&points, style.splinesteps)
            } else {
                points.clone()
            };

            if let Some(color) = style.fill {
                let stroke = LineStroke {
                    stroke: Stroke::new(style.width, color),
                    dash: style.dash.clone(),
                    cap: style.capstyle,
                    join: style.joinstyle,
                };
                self.surface
                    .polyline(Tag::Feature(self.tag.clone()), path.clone(), stroke);

                let n = path.len();
                if style.arrow.at_first() {
                    let head = arrow_head(path[1], path[0], style.width);
                    self.surface
                        .polygon(Tag::Feature(self.tag.clone()), head.to_vec(), color);
                }
                if style.arrow.at_last() {
                    let head = arrow_head(path[n - 2], path[n - 1], style.width);
                    self.surface
                        .polygon(Tag::Feature(self.tag.clone()), head.to_vec(), color);
                }
            }

            self.surface.register_hit(
                self.tag.clone(),
                HitRegion::Polyline {
                    points: path,
                    width: style.width,
                },
            );
            last_end = points.last().copied();
        }

        self.label(last_end, Vec2::ZERO);
    }

    /// Every polygon filled through its own mask, so holes stay with their shell. Outlines go on
    /// top, the label at the rightmost vertex.
    fn shapes<'c>(mut self, polygons: impl IntoIterator<Item = &'c Polygon>, clip: Rect) {
        let style = ShapeStyle::from_properties(&self.feature.properties);
        let fill = style.fill_color();
        let mut rightmost: Option<Pos2> = None;

        for polygon in polygons {
            let rings: Vec<Vec<Pos2>> = std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| ring.0.iter().map(|coord| self.project(coord)).collect())
                .collect();

            if let Some(color) = fill
                && let Some(mask) = Mask::rasterize(&rings, clip)
            {
                self.surface.image(
                    Tag::Feature(self.tag.clone()),
                    mask.min(),
                    mask.composite(color),
                );
            }

            if let Some(outline) = style.outline {
                for ring in &rings {
                    self.surface.polyline(
                        Tag::Feature(self.tag.clone()),
                        ring.clone(),
                        Stroke::new(style.width, outline).into(),
                    );
                }
            }

            for vertex in rings.iter().flatten() {
                if rightmost.is_none_or(|r| vertex.x > r.x) {
                    rightmost = Some(*vertex);
                }
            }

            self.surface
                .register_hit(self.tag.clone(), HitRegion::Polygon { rings });
        }

        self.label(rightmost, Vec2::ZERO);
    }
}

/// Triangle pointing from `from` to `to`, with its tip at `to`.
fn arrow_head(from: Pos2, to: Pos2, width: f32) -> [Pos2; 3] {
    let direction = (to - from).normalized();
    let across = direction.rot90() * (3. + width / 2.);
    let base = to - direction * 10.;
    [to, base + across, base - across]
}

/// Quadratic B-spline through the points, keeping both ends in place.
fn smooth(points: &[Pos2], steps: usize) -> Vec<Pos2> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut curve = vec![points[0]];

    for i in 1..last {
        let start = if i == 1 {
            points[0]
        } else {
            points[i - 1].lerp(points[i], 0.5)
        };
        let end = if i == last - 1 {
            points[last]
        } else {
            points[i].lerp(points[i + 1], 0.5)
        };

        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            let a = start.lerp(points[i], t);
            let b = points[i].lerp(end, t);
            curve.push(a.lerp(b, t));
        }
    }

    curve
}

/// Split loaded features into `polygons`, `lines` and `points` layers, in this order, so that
/// points end up on top.
pub fn layers_from_geojson(
    loader: &mut FeatureLoader,
    geojson: &Value,
    label_key: Option<&str>,
) -> Vec<Layer> {
    let mut layers = [
        Layer::new("polygons", FeatureFamily::Shapes),
        Layer::new("lines", FeatureFamily::Lines),
        Layer::new("points", FeatureFamily::Points),
    ];

    for feature in loader.load(geojson) {
        let Some(family) = feature.family() else {
            log::warn!(
                "Skipping feature #{} without usable geometry.",
                feature.sequence_index
            );
            continue;
        };

        if let Some(layer) = layers.iter_mut().find(|layer| layer.family == family)
            && let Err(err) = layer.add_feature(feature)
        {
            log::warn!("{err}");
        }
    }

    layers
        .into_iter()
        .map(|layer| match label_key {
            Some(key) => layer.with_label_key(key),
            None => layer,
        })
        .collect()
}
