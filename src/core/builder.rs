//! Map builder for fluent API configuration
//!
//! Collects the options and the engine factory a [`MapHandle`] needs and
//! hands back a ready-to-attach handle.

use std::sync::Arc;

use crate::{
    core::{
        config::MapOptions,
        engine::EngineFactory,
        geo::LngLat,
        headless::HeadlessFactory,
        map::MapHandle,
    },
};

/// Builder for creating and configuring MapHandle instances
pub struct MapBuilder {
    options: MapOptions,
    factory: Option<Arc<dyn EngineFactory>>,
}

impl MapBuilder {
    /// Create a new MapBuilder with default settings
    pub fn new() -> Self {
        Self {
            options: MapOptions::default(),
            factory: None,
        }
    }

    /// Replace all options at once
    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.options.access_token = Some(token.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.options.map_style = style.into();
        self
    }

    /// Set the initial center and zoom level
    pub fn with_center_and_zoom(mut self, center: LngLat, zoom: f64) -> Self {
        self.options.center = center;
        self.options.zoom = zoom;
        self
    }

    /// Set the engine backend
    pub fn with_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the handle. Without an explicit factory the map runs on a
    /// [`HeadlessFactory`] whose engine fires its readiness signals on its own.
    pub fn build(self) -> MapHandle {
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(HeadlessFactory::auto_ready()));
        MapHandle::new(self.options, factory)
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_applies_options() {
        let map = MapBuilder::new()
            .with_access_token("TOKEN")
            .with_style("mapbox://styles/mapbox/streets-v11")
            .with_center_and_zoom(LngLat::new(10.0, 20.0), 5.0)
            .build();

        let options = map.options();
        assert_eq!(options.access_token.as_deref(), Some("TOKEN"));
        assert_eq!(options.map_style, "mapbox://styles/mapbox/streets-v11");
        assert_eq!(options.center, LngLat::new(10.0, 20.0));
        assert_eq!(options.zoom, 5.0);
        assert!(!map.is_ready());
    }
}
