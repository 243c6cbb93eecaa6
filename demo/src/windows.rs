use egui::{Align2, RichText, Ui, Window};
use tilecanvas::sources::Attribution;

use crate::MyApp;

pub fn acknowledge(ui: &Ui, attribution: Attribution) {
    if attribution.text.is_empty() {
        return;
    }

    Window::new("Acknowledge")
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::LEFT_TOP, [10., 10.])
        .show(ui.ctx(), |ui| {
            ui.horizontal(|ui| {
                ui.label("map provided by");
                ui.hyperlink_to(attribution.text, attribution.url);
            });
        });
}

pub fn controls(app: &mut MyApp, ui: &Ui) {
    Window::new("Controls")
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::RIGHT_TOP, [-10., 10.])
        .fixed_size([180., 150.])
        .show(ui.ctx(), |ui| {
            ui.collapsing("Layers", |ui| {
                for name in ["polygons", "lines", "points"] {
                    let Some(layer) = app.map_memory.layer(name) else {
                        continue;
                    };

                    let mut visible = layer.visible();
                    let label = format!("{name} ({})", layer.feature_count());
                    if ui.checkbox(&mut visible, label).changed()
                        && let Some(layer) = app.map_memory.layer_mut(name)
                    {
                        layer.set_visible(visible);
                    }
                }

                ui.separator();
                ui.label("Point label to remove with Delete:");
                ui.text_edit_singleline(&mut app.selected);
            });

            ui.collapsing("HTTP statistics", |ui| {
                if let Some(tiles) = &app.tiles {
                    ui.label(format!(
                        "requests in progress: {}",
                        tiles.stats().in_progress
                    ));
                }
            });

            if let Some(tag) = app.map_memory.hovered() {
                ui.label(tag.to_string());
            }
        });
}

/// Simple GUI to zoom in and out.
pub fn zoom(app: &mut MyApp, ui: &Ui) {
    Window::new("Map")
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::LEFT_BOTTOM, [10., -10.])
        .show(ui.ctx(), |ui| {
            ui.horizontal(|ui| {
                let mut steps = 0;
                if ui.button(RichText::new("➕").heading()).clicked() {
                    steps = 1;
                }

                if ui.button(RichText::new("➖").heading()).clicked() {
                    steps = -1;
                }

                if steps != 0
                    && let Some(tiles) = app.tiles.as_mut()
                {
                    app.map_memory.zoom_by(steps, tiles);
                }
            });
        });
}
