use egui::{Pos2, Stroke};

use crate::scene::{FeatureTag, HitRegion, Surface, Tag, TextStyle};
use crate::style::LabelStyle;

/// Text on a background box, with its top-left corner at `anchor` moved by the style's offset.
pub fn draw_label(
    surface: &mut dyn Surface,
    tag: &FeatureTag,
    anchor: Pos2,
    text: &str,
    style: &LabelStyle,
) {
    let text_style = TextStyle {
        font_family: style.font_family.clone(),
        size: style.font_size,
        color: style.color,
    };

    let (text_id, bounds) =
        surface.text(Tag::Label(tag.clone()), anchor + style.offset, text, &text_style);

    let border = style
        .border_color
        .filter(|_| style.border_width > 0.)
        .map(|color| Stroke::new(style.border_width, color));

    if style.background.is_some() || border.is_some() {
        let background = surface.rect(Tag::Label(tag.clone()), bounds, style.background, border);
        surface.lower(background, text_id);
    }

    surface.register_hit(tag.clone(), HitRegion::Rect(bounds));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Primitive, Scene};
    use egui::{Color32, pos2, vec2};

    fn tag() -> FeatureTag {
        FeatureTag {
            layer: "points".to_owned(),
            sequence_index: 7,
        }
    }

    #[test]
    fn background_goes_beneath_text() {
        let mut scene = Scene::default();
        let style = LabelStyle::from_properties(&Default::default(), vec2(6., -6.));

        draw_label(&mut scene, &tag(), pos2(100., 100.), "Warsaw", &style);

        let primitives = scene.primitives();
        assert_eq!(primitives.len(), 2);

        let Primitive::Rect { rect, fill, outline } = &primitives[0].primitive else {
            panic!("background is not at the bottom");
        };
        let Primitive::Text { pos, text, .. } = &primitives[1].primitive else {
            panic!("text is not on top");
        };

        assert_eq!(*pos, pos2(106., 94.));
        assert_eq!(text, "Warsaw");
        assert_eq!(rect.min, *pos);
        assert_eq!(*fill, Some(Color32::from_rgb(211, 211, 211)));
        assert_eq!(outline.map(|stroke| stroke.width), Some(1.));
        assert!(primitives.iter().all(|p| p.tag == Tag::Label(tag())));

        assert_eq!(scene.hit_test(pos2(110., 98.)), Some(&tag()));
    }

    #[test]
    fn no_background_when_not_wanted() {
        let mut scene = Scene::default();
        let properties = serde_json::json!({ "label_bg": "", "label_border_width": 0 });
        let style = LabelStyle::from_properties(properties.as_object().unwrap(), vec2(0., 0.));

        draw_label(&mut scene, &tag(), pos2(0., 0.), "x", &style);
        assert_eq!(scene.len(), 1);
    }
}
