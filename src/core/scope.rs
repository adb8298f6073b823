//! Hands the map handle to everything mounted on one map.

use crate::{
    core::{geo::LngLat, map::MapHandle},
    layers::collection::LayerCollection,
    ui::{
        controls::ControlManager,
        marker::{Marker, MarkerOptions},
        popup::MapPopup,
        render_target::RenderTarget,
    },
    Result,
};

/// The components of one mounted map root share this scope. Components
/// created from it read the handle only to target their engine calls.
#[derive(Debug, Clone)]
pub struct MapScope {
    map: MapHandle,
}

impl MapScope {
    pub fn new(map: MapHandle) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &MapHandle {
        &self.map
    }

    pub fn layer_collection(&self) -> LayerCollection {
        LayerCollection::new(self.map.clone())
    }

    pub fn controls(&self) -> ControlManager {
        ControlManager::new(self.map.clone())
    }

    /// Mounts `marker` on the map.
    pub fn mount_marker(&self, mut marker: Marker) -> Result<Marker> {
        marker.mount(self.map.engine()?.as_ref())?;
        Ok(marker)
    }

    /// Shorthand for a default pin at `lng_lat`.
    pub fn marker(&self, lng_lat: impl Into<LngLat>) -> Result<Marker> {
        self.mount_marker(Marker::new(MarkerOptions::new(lng_lat)))
    }

    /// Mounts a popup showing `content` at `lng_lat`.
    pub fn popup(&self, lng_lat: impl Into<LngLat>, content: RenderTarget) -> Result<MapPopup> {
        self.mount_popup(MapPopup::new(lng_lat, content))
    }

    pub fn mount_popup(&self, mut popup: MapPopup) -> Result<MapPopup> {
        popup.mount(self.map.engine()?.as_ref())?;
        Ok(popup)
    }
}

impl From<MapHandle> for MapScope {
    fn from(map: MapHandle) -> Self {
        Self::new(map)
    }
}
