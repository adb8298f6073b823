//! Configuration for map handles.
//!
//! Every field has a default so an application can deserialize a partial
//! JSON object, or start from [`MapOptions::default`] and override what it
//! needs with the `with_*` methods.

use serde::{Deserialize, Serialize};

use crate::{
    core::{
        constants::{DEFAULT_CSS_FILE, DEFAULT_MAP_STYLE, DEFAULT_ZOOM, STYLESHEET_ID},
        geo::LngLat,
    },
    Result,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapOptions {
    /// Token used to retrieve data from the style server.
    pub access_token: Option<String>,
    /// URL of the engine stylesheet (not the map style).
    pub css_file: String,
    /// Identifier the stylesheet is registered under process-wide.
    pub stylesheet_id: String,
    /// Style object id or URL.
    pub map_style: String,
    pub center: LngLat,
    pub zoom: f64,
    /// Engine options this crate does not interpret, passed through as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            access_token: None,
            css_file: DEFAULT_CSS_FILE.to_string(),
            stylesheet_id: STYLESHEET_ID.to_string(),
            map_style: DEFAULT_MAP_STYLE.to_string(),
            center: LngLat::default(),
            zoom: DEFAULT_ZOOM,
            extra: serde_json::Map::new(),
        }
    }
}

impl MapOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_css_file(mut self, url: impl Into<String>) -> Self {
        self.css_file = url.into();
        self
    }

    pub fn with_stylesheet_id(mut self, id: impl Into<String>) -> Self {
        self.stylesheet_id = id.into();
        self
    }

    pub fn with_map_style(mut self, style: impl Into<String>) -> Self {
        self.map_style = style.into();
        self
    }

    pub fn with_center(mut self, center: impl Into<LngLat>) -> Self {
        self.center = center.into();
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    /// Sets an engine option that has no dedicated field.
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}
