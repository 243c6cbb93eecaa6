//! Shows GeoJSON given on the command line over OpenStreetMap, or over tiles from
//! `TILECANVAS_TILE_URL`.

mod windows;

use tilecanvas::sources::{OpenStreetMap, UrlTemplate};
use tilecanvas::{
    FeatureFilter, HttpOptions, HttpTiles, Interaction, Map, MapMemory, MapOptions, Zoom, lat_lon,
};

fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    eframe::run_native(
        "tilecanvas",
        Default::default(),
        Box::new(|cc| Ok(Box::new(MyApp::new(cc.egui_ctx.clone())))),
    )
}

fn tiles(egui_ctx: egui::Context) -> Option<HttpTiles> {
    let options = HttpOptions {
        contact: std::env::var("TILECANVAS_CONTACT").ok(),
        ..Default::default()
    };

    let tiles = match std::env::var("TILECANVAS_TILE_URL") {
        Ok(template) => UrlTemplate::new(template)
            .ok()
            .map(|source| HttpTiles::with_options(source, options, egui_ctx)),
        Err(_) => Some(HttpTiles::with_options(OpenStreetMap, options, egui_ctx)),
    }?;

    tiles
        .inspect_err(|err| log::error!("Cannot start downloading tiles: {err}"))
        .ok()
}

fn load_geojson(memory: &mut MapMemory, path: &str) {
    let loaded = std::fs::read_to_string(path)
        .map_err(|err| err.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|err| err.to_string()));

    match loaded {
        Ok(geojson) => memory.add_geojson(&geojson, None),
        Err(err) => log::error!("Cannot load {path}: {err}"),
    }
}

pub struct MyApp {
    tiles: Option<HttpTiles>,
    map_memory: MapMemory,
    /// Label of points to remove.
    selected: String,
}

impl MyApp {
    pub fn new(egui_ctx: egui::Context) -> Self {
        let mut map_memory = MapMemory::new(
            lat_lon(51.1, 17.03),
            Zoom::default(),
            MapOptions::default(),
        );

        if let Some(path) = std::env::args().nth(1) {
            load_geojson(&mut map_memory, &path);
        }

        for name in ["polygons", "lines", "points"] {
            if let Some(layer) = map_memory.layer_mut(name) {
                layer.on(Interaction::Click, |feature| {
                    log::info!(
                        "Clicked {} of {}.",
                        feature.id,
                        feature.collection_name.as_deref().unwrap_or("no collection")
                    );
                });
            }
        }

        Self {
            tiles: tiles(egui_ctx),
            map_memory,
            selected: String::new(),
        }
    }

    /// Drop every feature of the points layer which has the label shown in the controls.
    fn remove_selected(&mut self) {
        let Some(tiles) = self.tiles.as_mut() else {
            return;
        };
        if self.selected.is_empty() {
            return;
        }

        let label = std::mem::take(&mut self.selected);
        let filter = FeatureFilter::default().with_property("label", label);
        let removed = self
            .map_memory
            .remove_features_and_redraw("points", &filter, tiles);
        log::info!("Removed {removed} points.");
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let rimless = egui::Frame {
            fill: ctx.style().visuals.panel_fill,
            ..Default::default()
        };

        egui::CentralPanel::default()
            .frame(rimless)
            .show(ctx, |ui| {
                let tiles = self
                    .tiles
                    .as_mut()
                    .map(|tiles| tiles as &mut dyn tilecanvas::Tiles);
                ui.add(Map::new(tiles, &mut self.map_memory));

                if let Some(tiles) = &self.tiles {
                    windows::acknowledge(ui, tiles.attribution());
                }
                windows::controls(self, ui);
                windows::zoom(self, ui);
            });

        if ctx.input(|input| input.key_pressed(egui::Key::Delete)) {
            self.remove_selected();
        }
    }
}
