//! In-memory engine.
//!
//! [`HeadlessEngine`] keeps a real layer stack, source and image registries
//! and a log of every call made against it. Readiness signals are either
//! raised on demand with [`HeadlessEngine::emit`] or, for an
//! [`auto_ready`](HeadlessEngine::auto_ready) engine, as soon as they are
//! subscribed to. Image loads resolve from an in-memory catalog and can be
//! held back to make registrations interleave.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use async_trait::async_trait;
use futures::{
    channel::oneshot,
    future::{BoxFuture, FutureExt},
};
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    core::{
        config::MapOptions,
        engine::{
            CloseListener, ControlId, EngineFactory, EventListener, MapEngine, MapEvent, MapImage,
            MapSignal, MarkerId, PopupId,
        },
        geo::LngLat,
        map::Container,
    },
    layers::{
        descriptor::{LayerEventType, LayerSpec},
        stack::LayerStack,
    },
    prelude::{HashMap, HashSet},
    ui::{
        controls::{ControlKind, ControlPosition},
        marker::MarkerOptions,
        popup::PopupOptions,
        render_target::RenderTarget,
    },
    MapError, Result,
};

/// One call made against a [`HeadlessEngine`], in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    AddLayer(Value),
    RemoveLayer(String),
    MoveLayer { id: String, before_id: String },
    AddSource(String),
    RemoveSource(String),
    HasImage(String),
    LoadImage(String),
    AddImage(String),
    SetLayoutProperty {
        layer_id: String,
        name: String,
        value: Value,
    },
    On {
        event_type: LayerEventType,
        layer_id: String,
    },
    Off {
        event_type: LayerEventType,
        layer_id: String,
    },
    AddControl(&'static str),
    RemoveControl(ControlId),
    AddMarker(MarkerId),
    UpdateMarker(MarkerId),
    SetMarkerLngLat(MarkerId, LngLat),
    RemoveMarker(MarkerId),
    AddPopup(PopupId),
    SetPopupLngLat(PopupId, LngLat),
    SetMarkerPopup(MarkerId, Option<PopupId>),
    RemovePopup(PopupId),
}

struct MarkerState {
    options: MarkerOptions,
    element: Option<RenderTarget>,
    popup: Option<PopupId>,
}

struct PopupState {
    options: PopupOptions,
    content: RenderTarget,
    lng_lat: Option<LngLat>,
    on_close: Option<CloseListener>,
}

#[derive(Default)]
struct EngineState {
    layers: LayerStack<Value>,
    sources: HashMap<String, Value>,
    images: HashMap<String, MapImage>,
    catalog: HashMap<String, MapImage>,
    listeners: Vec<(LayerEventType, String, EventListener)>,
    controls: HashMap<ControlId, (ControlKind, ControlPosition)>,
    markers: HashMap<MarkerId, MarkerState>,
    popups: HashMap<PopupId, PopupState>,
    signals: Vec<(MapSignal, oneshot::Sender<()>)>,
    rejected: HashSet<String>,
    calls: Vec<EngineCall>,
    next_id: u64,
}

impl EngineState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct HeadlessEngine {
    state: Mutex<EngineState>,
    auto_ready: bool,
    /// While true, image loads wait before resolving.
    image_gate: watch::Sender<bool>,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeadlessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessEngine")
            .field("layers", &self.layer_ids())
            .field("auto_ready", &self.auto_ready)
            .finish()
    }
}

impl HeadlessEngine {
    /// An engine whose readiness signals fire only through [`Self::emit`].
    pub fn new() -> Self {
        let (image_gate, _) = watch::channel(false);
        Self {
            state: Mutex::new(EngineState::default()),
            auto_ready: false,
            image_gate,
        }
    }

    /// An engine that reports ready as soon as it is asked.
    pub fn auto_ready() -> Self {
        Self {
            auto_ready: true,
            ..Self::new()
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: EngineCall) -> MutexGuard<'_, EngineState> {
        let mut state = self.state();
        #[cfg(feature = "debug")]
        log::trace!("headless: {call:?}");
        state.calls.push(call);
        state
    }

    /// Fires `signal` for everyone currently waiting on it.
    pub fn emit(&self, signal: MapSignal) {
        let waiting = {
            let mut state = self.state();
            let (fired, kept) = std::mem::take(&mut state.signals)
                .into_iter()
                .partition::<Vec<_>, _>(|(waiting_for, _)| *waiting_for == signal);
            state.signals = kept;
            fired
        };
        for (_, sender) in waiting {
            let _ = sender.send(());
        }
    }

    /// Drops every pending signal subscription without firing it.
    pub fn drop_signal_listeners(&self) {
        self.state().signals.clear();
    }

    /// Makes the image at `url` available to [`MapEngine::load_image`].
    pub fn add_catalog_image(&self, url: impl Into<String>, image: MapImage) {
        self.state().catalog.insert(url.into(), image);
    }

    pub fn hold_image_loads(&self) {
        self.image_gate.send_replace(true);
    }

    pub fn release_image_loads(&self) {
        self.image_gate.send_replace(false);
    }

    /// Makes every later `add_layer` for `id` fail.
    pub fn reject_layer(&self, id: impl Into<String>) {
        self.state().rejected.insert(id.into());
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Every `move_layer` call so far as `(id, before_id)` pairs.
    pub fn moves(&self) -> Vec<(String, String)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::MoveLayer { id, before_id } => Some((id.clone(), before_id.clone())),
                _ => None,
            })
            .collect()
    }

    /// How many recorded calls match `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(*call)).count()
    }

    /// Layer ids in render order, bottom to top.
    pub fn layer_ids(&self) -> Vec<String> {
        self.state().layers.ids()
    }

    /// The layer as the engine holds it, including layout changes made
    /// after it was added.
    pub fn layer(&self, id: &str) -> Option<Value> {
        self.state().layers.get(id).cloned()
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.state().sources.contains_key(id)
    }

    pub fn image_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state().images.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn listener_count(&self, layer_id: &str) -> usize {
        self.state()
            .listeners
            .iter()
            .filter(|(_, id, _)| id == layer_id)
            .count()
    }

    /// Invokes the listeners bound to `event_type` on `layer_id`. Returns how
    /// many ran.
    pub fn dispatch(
        &self,
        event_type: LayerEventType,
        layer_id: &str,
        lng_lat: Option<LngLat>,
    ) -> usize {
        let listeners: Vec<EventListener> = self
            .state()
            .listeners
            .iter()
            .filter(|(bound_type, id, _)| *bound_type == event_type && id == layer_id)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        let event = MapEvent {
            event_type,
            layer_id: layer_id.to_string(),
            lng_lat,
            features: Vec::new(),
        };
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    pub fn control_count(&self) -> usize {
        self.state().controls.len()
    }

    pub fn control(&self, id: ControlId) -> Option<(ControlKind, ControlPosition)> {
        self.state().controls.get(&id).cloned()
    }

    pub fn marker_ids(&self) -> Vec<MarkerId> {
        let mut ids: Vec<MarkerId> = self.state().markers.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn marker_options(&self, id: MarkerId) -> Option<MarkerOptions> {
        self.state().markers.get(&id).map(|marker| marker.options.clone())
    }

    /// Content of the custom element the marker adopted, if any.
    pub fn marker_content(&self, id: MarkerId) -> Option<String> {
        self.state()
            .markers
            .get(&id)
            .and_then(|marker| marker.element.as_ref().map(RenderTarget::content))
    }

    pub fn marker_popup(&self, id: MarkerId) -> Option<PopupId> {
        self.state().markers.get(&id).and_then(|marker| marker.popup)
    }

    pub fn popup_ids(&self) -> Vec<PopupId> {
        let mut ids: Vec<PopupId> = self.state().popups.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn popup_lng_lat(&self, id: PopupId) -> Option<LngLat> {
        self.state().popups.get(&id).and_then(|popup| popup.lng_lat)
    }

    pub fn popup_content(&self, id: PopupId) -> Option<String> {
        self.state()
            .popups
            .get(&id)
            .map(|popup| popup.content.content())
    }

    pub fn popup_options(&self, id: PopupId) -> Option<PopupOptions> {
        self.state().popups.get(&id).map(|popup| popup.options.clone())
    }

    /// Closes a popup the way a user would, running its close callback.
    pub fn close_popup(&self, id: PopupId) -> bool {
        let Some(popup) = self.state().popups.remove(&id) else {
            return false;
        };
        if let Some(on_close) = popup.on_close {
            on_close();
        }
        true
    }
}

#[async_trait]
impl MapEngine for HeadlessEngine {
    fn once(&self, signal: MapSignal) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        if self.auto_ready {
            let _ = sender.send(());
        } else {
            self.state().signals.push((signal, sender));
        }
        receiver
    }

    fn add_layer(&self, spec: &LayerSpec) -> Result<()> {
        let value = serde_json::to_value(spec)?;
        let mut state = self.record(EngineCall::AddLayer(value.clone()));

        if state.rejected.contains(&spec.id) {
            return Err(MapError::Engine(format!("layer `{}` rejected", spec.id)));
        }
        if state.layers.contains(&spec.id) {
            return Err(MapError::Engine(format!(
                "layer `{}` already exists",
                spec.id
            )));
        }
        match &spec.source {
            // Inline sources are registered under the layer id.
            Some(source @ Value::Object(_)) => {
                state.sources.insert(spec.id.clone(), source.clone());
            }
            Some(Value::String(source_id)) if !state.sources.contains_key(source_id) => {
                return Err(MapError::Engine(format!(
                    "source `{source_id}` does not exist"
                )));
            }
            _ => {}
        }
        state.layers.push(spec.id.clone(), value);
        Ok(())
    }

    fn remove_layer(&self, id: &str) -> Result<()> {
        let mut state = self.record(EngineCall::RemoveLayer(id.to_string()));
        state
            .layers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MapError::UnknownLayer(id.to_string()))
    }

    fn move_layer(&self, id: &str, before_id: &str) -> Result<()> {
        let mut state = self.record(EngineCall::MoveLayer {
            id: id.to_string(),
            before_id: before_id.to_string(),
        });
        for layer in [id, before_id] {
            if !state.layers.contains(layer) {
                return Err(MapError::UnknownLayer(layer.to_string()));
            }
        }
        state.layers.move_before(id, before_id);
        Ok(())
    }

    fn add_source(&self, id: &str, source: &Value) -> Result<()> {
        let mut state = self.record(EngineCall::AddSource(id.to_string()));
        if state.sources.contains_key(id) {
            return Err(MapError::Engine(format!("source `{id}` already exists")));
        }
        state.sources.insert(id.to_string(), source.clone());
        Ok(())
    }

    fn remove_source(&self, id: &str) -> Result<()> {
        let mut state = self.record(EngineCall::RemoveSource(id.to_string()));
        state.sources.remove(id);
        Ok(())
    }

    fn has_image(&self, id: &str) -> bool {
        self.record(EngineCall::HasImage(id.to_string()))
            .images
            .contains_key(id)
    }

    async fn load_image(&self, url: &str) -> Result<MapImage> {
        drop(self.record(EngineCall::LoadImage(url.to_string())));

        // Loads always complete asynchronously.
        tokio::task::yield_now().await;
        let mut gate = self.image_gate.subscribe();
        if gate.wait_for(|held| !*held).await.is_err() {
            return Err(MapError::ImageLoad {
                url: url.to_string(),
                reason: "engine dropped".to_string(),
            });
        }

        self.state()
            .catalog
            .get(url)
            .cloned()
            .ok_or_else(|| MapError::ImageLoad {
                url: url.to_string(),
                reason: "not found".to_string(),
            })
    }

    fn add_image(&self, id: &str, image: MapImage, _options: Option<&Value>) -> Result<()> {
        let mut state = self.record(EngineCall::AddImage(id.to_string()));
        if state.images.contains_key(id) {
            return Err(MapError::Engine(format!("image `{id}` already exists")));
        }
        state.images.insert(id.to_string(), image);
        Ok(())
    }

    fn set_layout_property(&self, layer_id: &str, name: &str, value: Value) -> Result<()> {
        let mut state = self.record(EngineCall::SetLayoutProperty {
            layer_id: layer_id.to_string(),
            name: name.to_string(),
            value: value.clone(),
        });
        let layer = state
            .layers
            .get_mut(layer_id)
            .ok_or_else(|| MapError::UnknownLayer(layer_id.to_string()))?;
        if let Some(object) = layer.as_object_mut() {
            let layout = object
                .entry("layout")
                .or_insert_with(|| Value::Object(Default::default()));
            if let Some(layout) = layout.as_object_mut() {
                layout.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    fn on(&self, event_type: LayerEventType, layer_id: &str, listener: &EventListener) {
        let mut state = self.record(EngineCall::On {
            event_type,
            layer_id: layer_id.to_string(),
        });
        state
            .listeners
            .push((event_type, layer_id.to_string(), listener.clone()));
    }

    fn off(&self, event_type: LayerEventType, layer_id: &str, listener: &EventListener) {
        let mut state = self.record(EngineCall::Off {
            event_type,
            layer_id: layer_id.to_string(),
        });
        if let Some(index) = state.listeners.iter().position(|(bound_type, id, bound)| {
            *bound_type == event_type && id == layer_id && Arc::ptr_eq(bound, listener)
        }) {
            state.listeners.remove(index);
        }
    }

    fn add_control(&self, control: &ControlKind, position: ControlPosition) -> Result<ControlId> {
        let mut state = self.record(EngineCall::AddControl(control.name()));
        let id = ControlId(state.next_id());
        state.controls.insert(id, (control.clone(), position));
        Ok(id)
    }

    fn remove_control(&self, id: ControlId) -> Result<()> {
        let mut state = self.record(EngineCall::RemoveControl(id));
        state
            .controls
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| MapError::Engine(format!("control {id:?} does not exist")))
    }

    fn add_marker(
        &self,
        options: &MarkerOptions,
        element: Option<&RenderTarget>,
    ) -> Result<MarkerId> {
        let mut state = self.state();
        let id = MarkerId(state.next_id());
        state.calls.push(EngineCall::AddMarker(id));
        state.markers.insert(
            id,
            MarkerState {
                options: options.clone(),
                element: element.cloned(),
                popup: None,
            },
        );
        Ok(id)
    }

    fn update_marker(&self, id: MarkerId, options: &MarkerOptions) -> Result<()> {
        let mut state = self.record(EngineCall::UpdateMarker(id));
        let marker = state
            .markers
            .get_mut(&id)
            .ok_or_else(|| MapError::Engine(format!("marker {id:?} does not exist")))?;
        let lng_lat = marker.options.lng_lat;
        marker.options = MarkerOptions {
            lng_lat,
            ..options.clone()
        };
        Ok(())
    }

    fn set_marker_lng_lat(&self, id: MarkerId, lng_lat: LngLat) -> Result<()> {
        let mut state = self.record(EngineCall::SetMarkerLngLat(id, lng_lat));
        let marker = state
            .markers
            .get_mut(&id)
            .ok_or_else(|| MapError::Engine(format!("marker {id:?} does not exist")))?;
        marker.options.lng_lat = lng_lat;
        Ok(())
    }

    fn remove_marker(&self, id: MarkerId) -> Result<()> {
        let mut state = self.record(EngineCall::RemoveMarker(id));
        state
            .markers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| MapError::Engine(format!("marker {id:?} does not exist")))
    }

    fn add_popup(
        &self,
        options: &PopupOptions,
        content: &RenderTarget,
        on_close: Option<CloseListener>,
    ) -> Result<PopupId> {
        let mut state = self.state();
        let id = PopupId(state.next_id());
        state.calls.push(EngineCall::AddPopup(id));
        state.popups.insert(
            id,
            PopupState {
                options: options.clone(),
                content: content.clone(),
                lng_lat: None,
                on_close,
            },
        );
        Ok(id)
    }

    fn set_popup_lng_lat(&self, id: PopupId, lng_lat: LngLat) -> Result<()> {
        let mut state = self.record(EngineCall::SetPopupLngLat(id, lng_lat));
        let popup = state
            .popups
            .get_mut(&id)
            .ok_or_else(|| MapError::Engine(format!("popup {id:?} does not exist")))?;
        popup.lng_lat = Some(lng_lat);
        Ok(())
    }

    fn set_marker_popup(&self, marker: MarkerId, popup: Option<PopupId>) -> Result<()> {
        let mut state = self.record(EngineCall::SetMarkerPopup(marker, popup));
        if let Some(popup) = popup {
            if !state.popups.contains_key(&popup) {
                return Err(MapError::Engine(format!("popup {popup:?} does not exist")));
            }
        }
        let marker_state = state
            .markers
            .get_mut(&marker)
            .ok_or_else(|| MapError::Engine(format!("marker {marker:?} does not exist")))?;
        marker_state.popup = popup;
        Ok(())
    }

    fn remove_popup(&self, id: PopupId) -> Result<()> {
        let mut state = self.record(EngineCall::RemovePopup(id));
        // Removing a popup the user already closed is fine.
        state.popups.remove(&id);
        Ok(())
    }
}

/// Hands out one shared [`HeadlessEngine`].
pub struct HeadlessFactory {
    engine: Arc<HeadlessEngine>,
    stylesheet_failure: Option<String>,
    stylesheet_loads: Arc<AtomicUsize>,
    created: AtomicUsize,
}

impl std::fmt::Debug for HeadlessFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessFactory")
            .field("stylesheet_failure", &self.stylesheet_failure)
            .field("stylesheet_loads", &self.stylesheet_loads())
            .field("created", &self.created())
            .finish()
    }
}

impl HeadlessFactory {
    pub fn new(engine: Arc<HeadlessEngine>) -> Self {
        Self {
            engine,
            stylesheet_failure: None,
            stylesheet_loads: Arc::new(AtomicUsize::new(0)),
            created: AtomicUsize::new(0),
        }
    }

    /// A factory around a fresh [`HeadlessEngine::auto_ready`] engine.
    pub fn auto_ready() -> Self {
        Self::new(Arc::new(HeadlessEngine::auto_ready()))
    }

    /// Makes every stylesheet load fail with `reason`.
    pub fn with_stylesheet_failure(mut self, reason: impl Into<String>) -> Self {
        self.stylesheet_failure = Some(reason.into());
        self
    }

    pub fn engine(&self) -> Arc<HeadlessEngine> {
        self.engine.clone()
    }

    /// How many stylesheet loads this factory has started.
    pub fn stylesheet_loads(&self) -> usize {
        self.stylesheet_loads.load(Ordering::SeqCst)
    }

    /// How many engines this factory has handed out.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl EngineFactory for HeadlessFactory {
    fn load_stylesheet(&self, id: &str, url: &str) -> BoxFuture<'static, Result<()>> {
        log::debug!("headless: loading stylesheet `{id}` from {url}");
        self.stylesheet_loads.fetch_add(1, Ordering::SeqCst);
        let failure = self.stylesheet_failure.clone();
        async move {
            tokio::task::yield_now().await;
            match failure {
                Some(reason) => Err(MapError::Engine(reason)),
                None => Ok(()),
            }
        }
        .boxed()
    }

    fn create(&self, container: &Container, options: &MapOptions) -> Result<Arc<dyn MapEngine>> {
        log::debug!(
            "headless: creating engine in `{}` with style {}",
            container.id,
            options.map_style
        );
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.engine.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::descriptor::{LayerDescriptor, LayerType};

    #[test]
    fn test_layer_stack_calls() {
        let engine = HeadlessEngine::new();
        for id in ["a", "b", "c"] {
            engine
                .add_layer(&LayerDescriptor::new(id, LayerType::Line).to_spec())
                .unwrap();
        }
        engine.move_layer("c", "a").unwrap();
        assert_eq!(engine.layer_ids(), vec!["c", "a", "b"]);

        assert!(matches!(
            engine.move_layer("a", "missing"),
            Err(MapError::UnknownLayer(id)) if id == "missing"
        ));
        assert!(engine.remove_layer("missing").is_err());
        assert!(engine.remove_source("missing").is_ok());
        assert_eq!(engine.moves().len(), 2);
    }

    #[test]
    fn test_inline_source_registered_under_layer_id() {
        let engine = HeadlessEngine::new();
        let layer = LayerDescriptor::new("roads", LayerType::Line)
            .with_source(serde_json::json!({ "type": "geojson", "data": {} }));
        engine.add_layer(&layer.to_spec()).unwrap();
        assert!(engine.has_source("roads"));
        assert!(engine.add_layer(&layer.to_spec()).is_err());
    }

    #[test]
    fn test_set_layout_property_updates_layer() {
        let engine = HeadlessEngine::new();
        engine
            .add_layer(&LayerDescriptor::new("a", LayerType::Fill).to_spec())
            .unwrap();
        engine
            .set_layout_property("a", "visibility", Value::from("none"))
            .unwrap();
        assert_eq!(
            engine.layer("a").unwrap()["layout"]["visibility"],
            Value::from("none")
        );
    }

    #[tokio::test]
    async fn test_signals_fire_on_emit() {
        let engine = HeadlessEngine::new();
        let load = engine.once(MapSignal::Load);
        let style = engine.once(MapSignal::StyleData);

        engine.emit(MapSignal::StyleData);
        assert_eq!(style.await, Ok(()));
        engine.emit(MapSignal::Load);
        assert_eq!(load.await, Ok(()));
    }

    #[tokio::test]
    async fn test_load_image_from_catalog() {
        let engine = HeadlessEngine::new();
        engine.add_catalog_image("https://img/pin.png", MapImage::blank(2, 2));

        let image = engine.load_image("https://img/pin.png").await.unwrap();
        assert_eq!(image.width, 2);
        assert!(matches!(
            engine.load_image("https://img/other.png").await,
            Err(MapError::ImageLoad { .. })
        ));
    }
}
