//! The imperative map engine this crate drives.
//!
//! Everything the reconciler does to a map goes through [`MapEngine`]; the
//! engine itself (tile fetching, rendering, projection) is opaque. Methods
//! take `&self` because engines of this kind are stateful objects shared by
//! every component mounted on the same map.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{channel::oneshot, future::BoxFuture};
use serde::{Deserialize, Serialize};

use crate::{
    core::{config::MapOptions, geo::LngLat, map::Container},
    layers::descriptor::{LayerEventType, LayerSpec},
    ui::{
        controls::{ControlKind, ControlPosition},
        marker::MarkerOptions,
        popup::PopupOptions,
        render_target::RenderTarget,
    },
    Result,
};

/// One-shot readiness signals raised by a freshly created engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapSignal {
    Load,
    StyleData,
}

impl std::fmt::Display for MapSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapSignal::Load => write!(f, "load"),
            MapSignal::StyleData => write!(f, "styledata"),
        }
    }
}

/// A decoded image ready to be registered with the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MapImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl MapImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A fully transparent RGBA image.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0; (width * height * 4) as usize])
    }
}

/// Payload passed to layer event listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEvent {
    pub event_type: LayerEventType,
    pub layer_id: String,
    pub lng_lat: Option<LngLat>,
    pub features: Vec<serde_json::Value>,
}

/// Listener bound to a layer event. Unbinding matches on pointer identity,
/// so the same `Arc` handed to [`MapEngine::on`] must be handed to
/// [`MapEngine::off`].
pub type EventListener = Arc<dyn Fn(&MapEvent) + Send + Sync>;

/// Invoked when the user closes a popup.
pub type CloseListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(pub u64);

#[async_trait]
pub trait MapEngine: Send + Sync {
    /// Subscribes to the next firing of `signal`. The receiver resolves once;
    /// a dropped sender means the engine went away before firing.
    fn once(&self, signal: MapSignal) -> oneshot::Receiver<()>;

    /// Adds a layer on top of the stack.
    fn add_layer(&self, spec: &LayerSpec) -> Result<()>;

    fn remove_layer(&self, id: &str) -> Result<()>;

    /// Places `id` immediately below `before_id`. Both must exist.
    fn move_layer(&self, id: &str, before_id: &str) -> Result<()>;

    fn add_source(&self, id: &str, source: &serde_json::Value) -> Result<()>;

    fn remove_source(&self, id: &str) -> Result<()>;

    fn has_image(&self, id: &str) -> bool;

    async fn load_image(&self, url: &str) -> Result<MapImage>;

    fn add_image(
        &self,
        id: &str,
        image: MapImage,
        options: Option<&serde_json::Value>,
    ) -> Result<()>;

    fn set_layout_property(
        &self,
        layer_id: &str,
        name: &str,
        value: serde_json::Value,
    ) -> Result<()>;

    fn on(&self, event_type: LayerEventType, layer_id: &str, listener: &EventListener);

    fn off(&self, event_type: LayerEventType, layer_id: &str, listener: &EventListener);

    fn add_control(&self, control: &ControlKind, position: ControlPosition) -> Result<ControlId>;

    fn remove_control(&self, id: ControlId) -> Result<()>;

    /// Adds a marker. When `element` is given the engine adopts it as the
    /// marker's content instead of drawing its default pin.
    fn add_marker(
        &self,
        options: &MarkerOptions,
        element: Option<&RenderTarget>,
    ) -> Result<MarkerId>;

    /// Forwards every marker option except the position.
    fn update_marker(&self, id: MarkerId, options: &MarkerOptions) -> Result<()>;

    fn set_marker_lng_lat(&self, id: MarkerId, lng_lat: LngLat) -> Result<()>;

    fn remove_marker(&self, id: MarkerId) -> Result<()>;

    fn add_popup(
        &self,
        options: &PopupOptions,
        content: &RenderTarget,
        on_close: Option<CloseListener>,
    ) -> Result<PopupId>;

    fn set_popup_lng_lat(&self, id: PopupId, lng_lat: LngLat) -> Result<()>;

    /// Binds `popup` to `marker`, or unbinds the current one with `None`.
    fn set_marker_popup(&self, marker: MarkerId, popup: Option<PopupId>) -> Result<()>;

    fn remove_popup(&self, id: PopupId) -> Result<()>;
}

/// Creates engine instances and provides the document-level resources they
/// depend on.
pub trait EngineFactory: Send + Sync {
    /// Loads the engine stylesheet. Called at most once per stylesheet id for
    /// the whole process, see [`crate::core::stylesheet`].
    fn load_stylesheet(&self, id: &str, url: &str) -> BoxFuture<'static, Result<()>>;

    fn create(&self, container: &Container, options: &MapOptions) -> Result<Arc<dyn MapEngine>>;
}
