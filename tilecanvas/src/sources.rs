//! Remote tile servers. Make sure you follow terms of usage of the particular source.

use crate::tiles::TileId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub text: &'static str,
    pub url: &'static str,
}

/// Remote tile server definition, source for the [`crate::HttpTiles`].
pub trait TileSource {
    fn tile_url(&self, tile_id: TileId) -> String;
    fn attribution(&self) -> Attribution;

    fn max_zoom(&self) -> u8 {
        19
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("tile URL template '{template}' lacks the {missing} placeholder")]
pub struct InvalidProviderTemplate {
    pub template: String,
    pub missing: &'static str,
}

/// Tile server given by an URL template with `{z}`, `{x}` and `{y}` placeholders, e.g.
/// `https://tile.openstreetmap.org/{z}/{x}/{y}.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, InvalidProviderTemplate> {
        let template = template.into();

        if let Some(missing) = ["{z}", "{x}", "{y}"]
            .into_iter()
            .find(|placeholder| !template.contains(placeholder))
        {
            let err = InvalidProviderTemplate { template, missing };
            log::error!("{err}");
            return Err(err);
        }

        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl TileSource for UrlTemplate {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.template
            .replace("{z}", &tile_id.zoom.to_string())
            .replace("{x}", &tile_id.x.to_string())
            .replace("{y}", &tile_id.y.to_string())
    }

    fn attribution(&self) -> Attribution {
        Attribution { text: "", url: "" }
    }
}

/// <https://www.openstreetmap.org/about>
#[derive(Debug, Clone, Copy, Hash)]
pub struct OpenStreetMap;

impl TileSource for OpenStreetMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.openstreetmap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "OpenStreetMap contributors",
            url: "https://www.openstreetmap.org/copyright",
        }
    }
}
