//! Polygons with holes, rasterized into an alpha mask and tinted with the fill color.

use egui::{Pos2, Rect};
use image::{Rgba, RgbaImage};
use tiny_skia::{BlendMode, FillRule, Paint, PathBuilder, Pixmap, Transform};

/// Which pixels of a polygon's bounding box belong to the polygon.
#[derive(Debug, Clone)]
pub struct Mask {
    /// Surface position of the top-left pixel.
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    alpha: Vec<u8>,
}

impl Mask {
    /// Rasterize projected rings of a single polygon: the first ring is filled, the following
    /// ones are carved out of it. Only the part within `clip` is rasterized. Returns `None` when
    /// nothing of the polygon would be visible.
    pub fn rasterize(rings: &[Vec<Pos2>], clip: Rect) -> Option<Self> {
        let (outer, holes) = rings.split_first()?;

        let bounds = Rect::from_points(outer).intersect(clip);
        if !bounds.is_positive() {
            return None;
        }

        let left = bounds.min.x.floor() as i32;
        let top = bounds.min.y.floor() as i32;
        let width = (bounds.max.x.ceil() as i32 - left).max(0) as u32;
        let height = (bounds.max.y.ceil() as i32 - top).max(0) as u32;

        let mut pixmap = Pixmap::new(width, height)?;
        let shift = Transform::from_translate(-left as f32, -top as f32);

        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = false;

        if let Some(path) = ring_path(outer) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, shift, None);
        }

        paint.blend_mode = BlendMode::Clear;
        for hole in holes {
            if let Some(path) = ring_path(hole) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, shift, None);
            }
        }

        let alpha = pixmap.pixels().iter().map(|pixel| pixel.alpha()).collect();

        Some(Self {
            left,
            top,
            width,
            height,
            alpha,
        })
    }

    /// Mask value at the given pixel of the mask, 0 meaning "not filled".
    pub fn value(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.alpha[(y * self.width + x) as usize]
    }

    /// Whether the surface pixel is covered.
    pub fn covers(&self, surface_x: i32, surface_y: i32) -> bool {
        let (Ok(x), Ok(y)) = (
            u32::try_from(surface_x - self.left),
            u32::try_from(surface_y - self.top),
        ) else {
            return false;
        };
        self.value(x, y) > 0
    }

    /// Transparent image of the mask's size, painted with `color` where the mask is set.
    pub fn composite(&self, color: [u8; 4]) -> RgbaImage {
        let [r, g, b, a] = color;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let coverage = self.value(x, y) as u32;
            Rgba([r, g, b, (a as u32 * coverage / 255) as u8])
        })
    }

    pub fn min(&self) -> Pos2 {
        Pos2::new(self.left as f32, self.top as f32)
    }
}

fn ring_path(ring: &[Pos2]) -> Option<tiny_skia::Path> {
    let (first, rest) = ring.split_first()?;

    let mut builder = PathBuilder::new();
    builder.move_to(first.x, first.y);
    for point in rest {
        builder.line_to(point.x, point.y);
    }
    builder.close();
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn square(min: f32, max: f32) -> Vec<Pos2> {
        vec![
            pos2(min, min),
            pos2(max, min),
            pos2(max, max),
            pos2(min, max),
            pos2(min, min),
        ]
    }

    fn surface() -> Rect {
        Rect::from_min_max(pos2(0., 0.), pos2(500., 500.))
    }

    #[test]
    fn hole_is_not_filled() {
        let mask = Mask::rasterize(&[square(100., 200.), square(130., 170.)], surface()).unwrap();

        assert_eq!((mask.left, mask.top, mask.width, mask.height), (100, 100, 100, 100));

        // Inside the hole.
        assert_eq!(mask.value(50, 50), 0);
        assert!(!mask.covers(150, 150));

        // Annulus between the outer ring and the hole.
        assert_eq!(mask.value(10, 10), 255);
        assert_eq!(mask.value(85, 50), 255);
        assert!(mask.covers(110, 150));

        // Outside of the polygon.
        assert!(!mask.covers(50, 50));
    }

    #[test]
    fn composite_is_transparent_outside_the_mask() {
        let mask = Mask::rasterize(&[square(10., 30.), square(15., 25.)], surface()).unwrap();
        let image = mask.composite([255, 0, 0, 128]);

        assert_eq!(image.dimensions(), (20, 20));
        assert_eq!(image.get_pixel(2, 2), &Rgba([255, 0, 0, 128]));
        assert_eq!(image.get_pixel(10, 10)[3], 0);
    }

    #[test]
    fn mask_is_clipped_to_the_surface() {
        let mask = Mask::rasterize(&[square(-1000., 100.)], surface()).unwrap();
        assert_eq!((mask.left, mask.top, mask.width, mask.height), (0, 0, 100, 100));
        assert!(mask.covers(50, 50));
    }

    #[test]
    fn polygon_off_the_surface_gives_nothing() {
        assert!(Mask::rasterize(&[square(600., 700.)], surface()).is_none());
        assert!(Mask::rasterize(&[], surface()).is_none());
    }
}
