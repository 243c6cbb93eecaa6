//! Styling read from feature properties. Every value is optional and falls back to a default.

use color::{AlphaColor, Srgb};
use egui::{Color32, Vec2, vec2};
use serde_json::{Map, Value};

type Properties = Map<String, Value>;

/// Color given by a CSS name or a hex code. Empty string means "do not paint".
fn color(properties: &Properties, key: &str, default: &str) -> Option<Color32> {
    let text = match properties.get(key) {
        None | Some(Value::Null) => default,
        Some(Value::String(text)) => text.as_str(),
        Some(other) => {
            log::warn!("Color '{key}' is not a string: {other}.");
            default
        }
    };

    parse_color(text).or_else(|| {
        log::warn!("Unknown color '{text}' for '{key}', using '{default}'.");
        parse_color(default)
    })
}

fn parse_color(text: &str) -> Option<Color32> {
    if text.trim().is_empty() {
        return None;
    }

    let rgba = text.trim().parse::<AlphaColor<Srgb>>().ok()?.to_rgba8();
    Some(Color32::from_rgba_unmultiplied(
        rgba.r, rgba.g, rgba.b, rgba.a,
    ))
}

fn number(properties: &Properties, key: &str, default: f64) -> f64 {
    match properties.get(key) {
        None | Some(Value::Null) => default,
        Some(value) => as_number(value).unwrap_or_else(|| {
            log::warn!("'{key}' is not a number: {value}.");
            default
        }),
    }
}

/// Numbers might come as strings, especially from hand-written files.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn flag(properties: &Properties, key: &str, default: bool) -> bool {
    match properties.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.),
        Some(Value::String(text)) => matches!(text.as_str(), "true" | "yes" | "1"),
        _ => default,
    }
}

fn offset(properties: &Properties, key: &str, default: Vec2) -> Vec2 {
    match properties.get(key).and_then(Value::as_array).map(Vec::as_slice) {
        Some([x, y]) => match (as_number(x), as_number(y)) {
            (Some(x), Some(y)) => vec2(x as f32, y as f32),
            _ => default,
        },
        Some(_) => {
            log::warn!("'{key}' should be a pair of numbers.");
            default
        }
        None => default,
    }
}

fn name<'a>(properties: &'a Properties, key: &str, default: &'a str) -> &'a str {
    properties
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub radius: f32,
    pub color: Option<Color32>,
    pub outline: Option<Color32>,
}

impl PointStyle {
    pub fn from_properties(properties: &Properties) -> Self {
        Self {
            radius: number(properties, "radius", 4.) as f32,
            color: color(properties, "color", "red"),
            outline: color(properties, "outline", ""),
        }
    }

    /// Where the label goes relative to the marker, unless told otherwise.
    pub fn default_label_offset(&self) -> Vec2 {
        vec2(self.radius + 2., -self.radius - 2.)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Arrow {
    #[default]
    None,
    First,
    Last,
    Both,
}

impl Arrow {
    pub fn at_first(&self) -> bool {
        matches!(self, Self::First | Self::Both)
    }

    pub fn at_last(&self) -> bool {
        matches!(self, Self::Last | Self::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapStyle {
    #[default]
    Round,
    Butt,
    Projecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinStyle {
    #[default]
    Round,
    Bevel,
    Miter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub fill: Option<Color32>,
    pub width: f32,

    /// Alternating dash and gap lengths in pixels.
    pub dash: Option<Vec<f32>>,

    pub arrow: Arrow,
    pub capstyle: CapStyle,
    pub joinstyle: JoinStyle,

    /// Draw a spline through the points instead of straight segments.
    pub smooth: bool,

    /// Segments per spline span when `smooth` is set.
    pub splinesteps: usize,
}

impl LineStyle {
    pub fn from_properties(properties: &Properties) -> Self {
        let arrow = match name(properties, "arrow", "none") {
            "first" => Arrow::First,
            "last" => Arrow::Last,
            "both" => Arrow::Both,
            _ => Arrow::None,
        };

        let capstyle = match name(properties, "capstyle", "round") {
            "butt" => CapStyle::Butt,
            "projecting" => CapStyle::Projecting,
            _ => CapStyle::Round,
        };

        let joinstyle = match name(properties, "joinstyle", "round") {
            "bevel" => JoinStyle::Bevel,
            "miter" => JoinStyle::Miter,
            _ => JoinStyle::Round,
        };

        let dash = properties.get("dash").and_then(Value::as_array).map(|pattern| {
            pattern
                .iter()
                .filter_map(as_number)
                .map(|length| length as f32)
                .filter(|length| *length > 0.)
                .collect::<Vec<_>>()
        });

        Self {
            fill: color(properties, "fill", "black"),
            width: number(properties, "width", 1.) as f32,
            dash: dash.filter(|pattern| !pattern.is_empty()),
            arrow,
            capstyle,
            joinstyle,
            smooth: flag(properties, "smooth", false),
            splinesteps: number(properties, "splinesteps", 12.).max(1.) as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Color32>,

    /// Opacity of the fill, within `0.0..=1.0`.
    pub alpha: f32,

    pub outline: Option<Color32>,
    pub width: f32,
}

impl ShapeStyle {
    pub fn from_properties(properties: &Properties) -> Self {
        let opacity = number(properties, "opacity", 0.5);

        Self {
            fill: color(properties, "fill", "red"),
            alpha: number(properties, "alpha", opacity).clamp(0., 1.) as f32,
            outline: color(properties, "outline", ""),
            width: number(properties, "width", 2.) as f32,
        }
    }

    /// Fill color with the opacity applied, `None` if there is nothing to fill.
    pub fn fill_color(&self) -> Option<[u8; 4]> {
        let [r, g, b, _] = self.fill?.to_srgba_unmultiplied();
        Some([r, g, b, (self.alpha * 255.).round() as u8])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub offset: Vec2,
    pub font_family: Option<String>,
    pub font_size: f32,
    pub color: Color32,
    pub background: Option<Color32>,
    pub border_color: Option<Color32>,
    pub border_width: f32,
}

impl LabelStyle {
    pub fn from_properties(properties: &Properties, default_offset: Vec2) -> Self {
        let (font_family, font_size) = font(properties);

        Self {
            offset: offset(properties, "label_offset", default_offset),
            font_family,
            font_size,
            color: color(properties, "label_color", "black").unwrap_or(Color32::BLACK),
            background: color(properties, "label_bg", "lightgray"),
            border_color: color(properties, "label_border_color", "gray"),
            border_width: number(properties, "label_border_width", 1.) as f32,
        }
    }
}

const DEFAULT_FONT_SIZE: f32 = 10.;

/// `label_font` is either `["Family", size, ...]`, a bare size, or `"Family size"`.
fn font(properties: &Properties) -> (Option<String>, f32) {
    match properties.get("label_font") {
        Some(Value::Array(parts)) => (
            parts.first().and_then(Value::as_str).map(str::to_owned),
            parts.get(1).and_then(as_number).map_or(DEFAULT_FONT_SIZE, |s| s as f32),
        ),
        Some(Value::Number(size)) => (
            None,
            size.as_f64().map_or(DEFAULT_FONT_SIZE, |s| s as f32),
        ),
        Some(Value::String(text)) => match text.rsplit_once(' ') {
            Some((family, size)) => match size.parse::<f32>() {
                Ok(size) => (Some(family.to_owned()), size),
                Err(_) => (Some(text.clone()), DEFAULT_FONT_SIZE),
            },
            None => (Some(text.clone()), DEFAULT_FONT_SIZE),
        },
        _ => (None, DEFAULT_FONT_SIZE),
    }
}
