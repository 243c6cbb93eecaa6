use std::collections::HashMap;
use std::time::Instant;

use egui::{
    Align2, Color32, ColorImage, Context, FontFamily, FontId, Id, Painter, PointerButton, Pos2,
    Rect, Response, Sense, Shape, Stroke, StrokeKind, TextureHandle, TextureOptions, Ui, Vec2,
    Widget, pos2,
};
use image::RgbaImage;

use crate::layer::Interaction;
use crate::memory::MapMemory;
use crate::scene::{LineStroke, Primitive, PrimitiveId, TextMeasure, TextStyle};
use crate::style::{CapStyle, JoinStyle};
use crate::tiles::{TileId, TileKind, Tiles};
use crate::viewport::SurfaceSize;

/// The actual map widget. Instances are to be created on each frame, as all necessary state is
/// stored in [`Tiles`] and [`MapMemory`].
///
/// # Examples
///
/// ```
/// # use tilecanvas::{Map, MapMemory, Tiles};
///
/// fn update(ui: &mut egui::Ui, tiles: &mut dyn Tiles, map_memory: &mut MapMemory) {
///     ui.add(Map::new(
///         Some(tiles), // `None`, if you don't want to show any tiles.
///         map_memory,
///     ));
/// }
/// ```
pub struct Map<'a, 'b> {
    tiles: Option<&'b mut dyn Tiles>,
    memory: &'a mut MapMemory,
}

impl<'a, 'b> Map<'a, 'b> {
    pub fn new(tiles: Option<&'b mut dyn Tiles>, memory: &'a mut MapMemory) -> Self {
        Self { tiles, memory }
    }
}

impl Widget for Map<'_, '_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter().with_clip_rect(rect);

        let mut no_tiles = NoTiles;
        let tiles: &mut dyn Tiles = match self.tiles {
            Some(tiles) => tiles,
            None => &mut no_tiles,
        };

        let memory = self.memory;
        memory.set_text_measure(Box::new(PainterMeasure(painter.clone())));

        let now = Instant::now();
        handle_input(ui, &response, rect, memory, tiles, now);

        if memory.poll(tiles, now) {
            log::trace!("Map redrawn.");
        }

        if memory.refresh_tiles(tiles) {
            log::trace!("Tiles arrived.");
        }

        if let Some(deadline) = memory.next_poll() {
            ui.ctx()
                .request_repaint_after(deadline.saturating_duration_since(now));
        }

        paint(ui.ctx(), response.id, &painter, rect, memory);
        response
    }
}

fn handle_input(
    ui: &Ui,
    response: &Response,
    rect: Rect,
    memory: &mut MapMemory,
    tiles: &mut dyn Tiles,
    now: Instant,
) {
    // Egui sizes are fractional, the surface is not.
    memory.resize(
        SurfaceSize::new(rect.width().round() as u32, rect.height().round() as u32),
        now,
    );

    let local = |pos: Pos2| pos2(pos.x - rect.min.x, pos.y - rect.min.y);

    if response.drag_started_by(PointerButton::Primary) {
        memory.drag_start();
    }

    if response.dragged_by(PointerButton::Primary) {
        memory.drag_move(response.drag_delta());
    }

    if response.drag_stopped_by(PointerButton::Primary) {
        memory.drag_end(tiles);
    }

    if response.hovered() {
        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll != 0. {
            memory.zoom_by(if scroll > 0. { 1 } else { -1 }, tiles);
        }
    }

    if let Some(pos) = response.interact_pointer_pos().map(local) {
        let interactions = [
            (response.double_clicked(), Interaction::DoubleClick),
            (response.clicked(), Interaction::Click),
            (response.secondary_clicked(), Interaction::RightClick),
            (response.middle_clicked(), Interaction::MiddleClick),
        ];

        for (_, interaction) in interactions.into_iter().filter(|(happened, _)| *happened) {
            memory.interact(interaction, pos);
        }
    }

    memory.hover(response.hover_pos().map(local));
}

/// Tile source which never has anything.
struct NoTiles;

impl Tiles for NoTiles {
    fn at(&mut self, _tile_id: TileId) -> Option<crate::tiles::Tile> {
        None
    }
}

/// Measures text the way [`Painter`] lays it out.
struct PainterMeasure(Painter);

impl TextMeasure for PainterMeasure {
    fn measure(&self, text: &str, style: &TextStyle) -> Vec2 {
        self.0
            .layout_no_wrap(text.to_owned(), font_id(style), style.color)
            .size()
    }
}

fn font_id(style: &TextStyle) -> FontId {
    let family = match style.font_family.as_deref().map(str::to_lowercase).as_deref() {
        Some("courier" | "monospace" | "mono" | "fixed") => FontFamily::Monospace,
        _ => FontFamily::Proportional,
    };
    FontId::new(style.size, family)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TextureKey {
    Tile(TileId, TileKind),
    Image(PrimitiveId),
}

/// Textures uploaded for the scene, kept in egui's memory between frames.
#[derive(Clone, Default)]
struct Textures(HashMap<TextureKey, TextureHandle>);

impl Textures {
    fn get_or_load(
        &mut self,
        ctx: &Context,
        key: TextureKey,
        decode: impl FnOnce() -> Option<RgbaImage>,
    ) -> Option<&TextureHandle> {
        if !self.0.contains_key(&key) {
            let image = decode()?;
            let image = ColorImage::from_rgba_unmultiplied(
                [image.width() as _, image.height() as _],
                image.as_raw(),
            );
            let handle = ctx.load_texture(format!("{key:?}"), image, TextureOptions::default());
            self.0.insert(key, handle);
        }
        self.0.get(&key)
    }
}

fn paint(ctx: &Context, id: Id, painter: &Painter, rect: Rect, memory: &MapMemory) {
    let mut textures: Textures = ctx.data_mut(|data| data.get_temp(id).unwrap_or_default());
    let mut used = Vec::new();
    let offset = rect.min.to_vec2();
    let whole = Rect::from_min_max(Pos2::ZERO, pos2(1., 1.));

    for scene_primitive in memory.scene().primitives() {
        match &scene_primitive.primitive {
            Primitive::Circle {
                center,
                radius,
                fill,
                outline,
            } => {
                painter.circle(
                    *center + offset,
                    *radius,
                    fill.unwrap_or(Color32::TRANSPARENT),
                    outline.unwrap_or(Stroke::NONE),
                );
            }
            Primitive::Polyline { points, stroke } => {
                let points: Vec<_> = points.iter().map(|p| *p + offset).collect();
                paint_polyline(painter, points, stroke);
            }
            Primitive::Polygon { points, fill } => {
                let points = points.iter().map(|p| *p + offset).collect();
                painter.add(Shape::convex_polygon(points, *fill, Stroke::NONE));
            }
            Primitive::Image { min, image } => {
                let key = TextureKey::Image(scene_primitive.id);
                if let Some(texture) =
                    textures.get_or_load(ctx, key, || Some(image.as_ref().clone()))
                {
                    let size = Vec2::new(image.width() as f32, image.height() as f32);
                    painter.image(
                        texture.id(),
                        Rect::from_min_size(*min + offset, size),
                        whole,
                        Color32::WHITE,
                    );
                    used.push(key);
                }
            }
            Primitive::Tile {
                tile_id,
                min,
                size,
                tile,
            } => {
                let key = TextureKey::Tile(*tile_id, tile.kind());
                let decode = || {
                    tile.decode()
                        .inspect_err(|err| log::warn!("Cannot decode tile {tile_id:?}: {err}"))
                        .ok()
                };
                if let Some(texture) = textures.get_or_load(ctx, key, decode) {
                    painter.image(
                        texture.id(),
                        Rect::from_min_size(*min + offset, Vec2::splat(*size)),
                        whole,
                        Color32::WHITE,
                    );
                    used.push(key);
                }
            }
            Primitive::Text { pos, text, style } => {
                painter.text(
                    *pos + offset,
                    Align2::LEFT_TOP,
                    text,
                    font_id(style),
                    style.color,
                );
            }
            Primitive::Rect {
                rect,
                fill,
                outline,
            } => {
                painter.rect(
                    rect.translate(offset),
                    0.,
                    fill.unwrap_or(Color32::TRANSPARENT),
                    outline.unwrap_or(Stroke::NONE),
                    StrokeKind::Inside,
                );
            }
        }
    }

    // Textures of tiles and images which are gone.
    textures.0.retain(|key, _| used.contains(key));
    ctx.data_mut(|data| data.insert_temp(id, textures));
}

fn paint_polyline(painter: &Painter, points: Vec<Pos2>, stroke: &LineStroke) {
    let width = stroke.stroke.width;
    let color = stroke.stroke.color;

    let mut round = Vec::new();
    if stroke.cap == CapStyle::Round {
        round.extend(points.first().copied());
        round.extend(points.last().copied());
    }
    if stroke.join == JoinStyle::Round && points.len() > 2 {
        round.extend(points[1..points.len() - 1].iter().copied());
    }

    match stroke.dash.as_deref() {
        Some(dash) if !dash.is_empty() => {
            let (dashes, gaps) = dashes_and_gaps(dash);
            painter.extend(Shape::dashed_line_with_offset(
                &points,
                stroke.stroke,
                &dashes,
                &gaps,
                0.,
            ));
        }
        _ => {
            painter.add(Shape::line(points, stroke.stroke));
        }
    }

    for center in round {
        painter.circle_filled(center, width / 2., color);
    }
}

/// Split alternating dash and gap lengths. Odd patterns repeat to make whole pairs.
fn dashes_and_gaps(pattern: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let pattern: Vec<f32> = if pattern.len() % 2 == 1 {
        pattern.iter().chain(pattern).copied().collect()
    } else {
        pattern.to_vec()
    };

    let dashes = pattern.iter().step_by(2).copied().collect();
    let gaps = pattern.iter().skip(1).step_by(2).copied().collect();
    (dashes, gaps)
}
