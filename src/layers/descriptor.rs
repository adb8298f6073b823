use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{
    constants::{ICON_IMAGE_PROPERTY, VISIBILITY_PROPERTY},
    engine::{EventListener, MapEvent},
};

/// Engine layer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    Background,
    Circle,
    Fill,
    FillExtrusion,
    Heatmap,
    Hillshade,
    Line,
    Raster,
    Sky,
    Symbol,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Background => write!(f, "background"),
            LayerType::Circle => write!(f, "circle"),
            LayerType::Fill => write!(f, "fill"),
            LayerType::FillExtrusion => write!(f, "fill-extrusion"),
            LayerType::Heatmap => write!(f, "heatmap"),
            LayerType::Hillshade => write!(f, "hillshade"),
            LayerType::Line => write!(f, "line"),
            LayerType::Raster => write!(f, "raster"),
            LayerType::Sky => write!(f, "sky"),
            LayerType::Symbol => write!(f, "symbol"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    None,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Visible => "visible",
            Visibility::None => "none",
        }
    }
}

/// Mouse and touch events the engine raises per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerEventType {
    Click,
    DblClick,
    MouseDown,
    MouseUp,
    MouseMove,
    MouseEnter,
    MouseLeave,
    MouseOver,
    MouseOut,
    ContextMenu,
    TouchStart,
    TouchEnd,
    TouchCancel,
}

impl std::fmt::Display for LayerEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LayerEventType::Click => "click",
            LayerEventType::DblClick => "dblclick",
            LayerEventType::MouseDown => "mousedown",
            LayerEventType::MouseUp => "mouseup",
            LayerEventType::MouseMove => "mousemove",
            LayerEventType::MouseEnter => "mouseenter",
            LayerEventType::MouseLeave => "mouseleave",
            LayerEventType::MouseOver => "mouseover",
            LayerEventType::MouseOut => "mouseout",
            LayerEventType::ContextMenu => "contextmenu",
            LayerEventType::TouchStart => "touchstart",
            LayerEventType::TouchEnd => "touchend",
            LayerEventType::TouchCancel => "touchcancel",
        };
        f.write_str(name)
    }
}

/// Event listeners of one layer.
///
/// Cloning shares the list. Two values are the same set of listeners only if
/// they share the list, which is how a unit decides whether to rebind.
#[derive(Clone, Default)]
pub struct LayerEvents(Arc<Vec<(LayerEventType, EventListener)>>);

impl LayerEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, event_type: LayerEventType, listener: EventListener) -> Self {
        let mut listeners = self.0.as_ref().clone();
        listeners.push((event_type, listener));
        Self(Arc::new(listeners))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(LayerEventType, EventListener)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ptr_eq(&self, other: &LayerEvents) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for LayerEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|(event_type, _)| event_type))
            .finish()
    }
}

/// A symbol icon to resolve before its layer is added.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolIcon {
    pub image_id: String,
    pub url: String,
    pub options: Option<Value>,
}

/// A declared layer.
///
/// The `id` is the layer's identity: the reconciler uses it, not structural
/// equality, to decide between adding, updating and removing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    /// URL of the image drawn by a symbol layer; the image id comes from the
    /// `icon-image` layout property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_options: Option<Value>,
    #[serde(skip)]
    pub on: Option<LayerEvents>,
}

impl LayerDescriptor {
    pub fn new(id: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            id: id.into(),
            layer_type,
            paint: None,
            layout: None,
            source: None,
            icon_image_url: None,
            image_options: None,
            on: None,
        }
    }

    pub fn with_paint(mut self, paint: Value) -> Self {
        self.paint = Some(paint);
        self
    }

    pub fn with_layout(mut self, layout: Value) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_source(mut self, source: Value) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the icon URL and the `icon-image` layout property naming it.
    pub fn with_icon(mut self, image_id: impl Into<String>, url: impl Into<String>) -> Self {
        self.set_layout_property(ICON_IMAGE_PROPERTY, Value::String(image_id.into()));
        self.icon_image_url = Some(url.into());
        self
    }

    pub fn with_image_options(mut self, options: Value) -> Self {
        self.image_options = Some(options);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.set_layout_property(VISIBILITY_PROPERTY, Value::from(visibility.as_str()));
        self
    }

    pub fn with_events(mut self, events: LayerEvents) -> Self {
        self.on = Some(events);
        self
    }

    /// Adds one listener, sharing nothing with previously set listeners.
    pub fn on<F>(mut self, event_type: LayerEventType, listener: F) -> Self
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        let events = self.on.take().unwrap_or_default();
        self.on = Some(events.with(event_type, Arc::new(listener)));
        self
    }

    fn set_layout_property(&mut self, name: &str, value: Value) {
        let layout = self
            .layout
            .get_or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !layout.is_object() {
            *layout = Value::Object(serde_json::Map::new());
        }
        if let Some(object) = layout.as_object_mut() {
            object.insert(name.to_string(), value);
        }
    }

    /// Declared visibility, if the layout sets one.
    pub fn visibility(&self) -> Option<Visibility> {
        self.layout
            .as_ref()?
            .get(VISIBILITY_PROPERTY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// The icon to preload, when both the URL and the `icon-image` id are set.
    pub fn symbol_icon(&self) -> Option<SymbolIcon> {
        let url = self.icon_image_url.clone()?;
        let image_id = self
            .layout
            .as_ref()?
            .get(ICON_IMAGE_PROPERTY)?
            .as_str()?
            .to_string();
        Some(SymbolIcon {
            image_id,
            url,
            options: self.image_options.clone(),
        })
    }

    /// Whether switching from `self` to `next` needs the layer to be removed
    /// and added again. Listeners and visibility are applied in place.
    pub fn requires_readd(&self, next: &LayerDescriptor) -> bool {
        self.layer_type != next.layer_type
            || self.paint != next.paint
            || self.source != next.source
            || self.icon_image_url != next.icon_image_url
            || self.image_options != next.image_options
            || layout_without_visibility(&self.layout) != layout_without_visibility(&next.layout)
    }

    /// The payload handed to [`crate::MapEngine::add_layer`].
    pub fn to_spec(&self) -> LayerSpec {
        LayerSpec {
            id: self.id.clone(),
            paint: self.paint.clone(),
            source: self.source.clone(),
            layer_type: self.layer_type,
            layout: self.layout.clone(),
        }
    }
}

/// Layout minus visibility. A layout holding nothing else compares equal to
/// no layout at all.
fn layout_without_visibility(layout: &Option<Value>) -> Option<Value> {
    let mut layout = layout.clone()?;
    if let Some(object) = layout.as_object_mut() {
        object.remove(VISIBILITY_PROPERTY);
        if object.is_empty() {
            return None;
        }
    }
    Some(layout)
}

/// What the engine receives when a layer is added. `paint` and `source` are
/// always present (null when unset); `layout` is left out entirely when the
/// descriptor has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    pub paint: Option<Value>,
    pub source: Option<Value>,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_omits_absent_layout() {
        let spec = LayerDescriptor::new("LAYER_1", LayerType::Line).to_spec();
        let value = serde_json::to_value(&spec).unwrap();

        assert_eq!(
            value,
            json!({ "id": "LAYER_1", "paint": null, "source": null, "type": "line" })
        );
        assert!(value.get("layout").is_none());
    }

    #[test]
    fn test_spec_keeps_declared_layout() {
        let spec = LayerDescriptor::new("LAYER_1", LayerType::Symbol)
            .with_layout(json!({ "text-field": "name" }))
            .to_spec();
        let value = serde_json::to_value(&spec).unwrap();

        assert_eq!(value["layout"], json!({ "text-field": "name" }));
        assert_eq!(value["type"], json!("symbol"));
    }

    #[test]
    fn test_symbol_icon_needs_url_and_id() {
        let descriptor = LayerDescriptor::new("LAYER_1", LayerType::Symbol)
            .with_layout(json!({ "icon-image": "ICON_IMAGE_ID" }));
        assert!(descriptor.symbol_icon().is_none());

        let descriptor = LayerDescriptor {
            icon_image_url: Some("ICON_IMAGE_URL".to_string()),
            ..descriptor
        };
        let icon = descriptor.symbol_icon().unwrap();
        assert_eq!(icon.image_id, "ICON_IMAGE_ID");
        assert_eq!(icon.url, "ICON_IMAGE_URL");
    }

    #[test]
    fn test_with_icon_sets_layout() {
        let descriptor =
            LayerDescriptor::new("LAYER_1", LayerType::Symbol).with_icon("ICON", "http://icon.png");
        assert_eq!(descriptor.layout, Some(json!({ "icon-image": "ICON" })));
        assert!(descriptor.symbol_icon().is_some());
    }

    #[test]
    fn test_visibility() {
        let descriptor = LayerDescriptor::new("LAYER_1", LayerType::Fill);
        assert_eq!(descriptor.visibility(), None);

        let descriptor = descriptor.with_visibility(Visibility::None);
        assert_eq!(descriptor.visibility(), Some(Visibility::None));
    }

    #[test]
    fn test_requires_readd() {
        let base = LayerDescriptor::new("LAYER_1", LayerType::Line);

        assert!(!base.requires_readd(&base.clone()));
        assert!(!base.requires_readd(&base.clone().with_visibility(Visibility::None)));
        assert!(!base.requires_readd(&base.clone().on(LayerEventType::Click, |_| {})));
        assert!(base.requires_readd(&base.clone().with_paint(json!({ "line-width": 2 }))));
        assert!(base.requires_readd(&LayerDescriptor::new("LAYER_1", LayerType::Fill)));
        assert!(base.requires_readd(&base.clone().with_source(json!("roads"))));
    }

    #[test]
    fn test_visibility_from_unset_is_not_a_readd() {
        let base = LayerDescriptor::new("LAYER_1", LayerType::Line);
        let hidden = base.clone().with_visibility(Visibility::None);

        assert!(!base.requires_readd(&hidden));
        assert!(!hidden.requires_readd(&base));
        assert!(!base.requires_readd(&base.clone().with_layout(json!({}))));
        assert!(hidden.requires_readd(
            &hidden.clone().with_layout(json!({ "line-cap": "round", "visibility": "none" }))
        ));
    }

    #[test]
    fn test_deserialize_descriptor() {
        let descriptor: LayerDescriptor = serde_json::from_value(json!({
            "id": "roads",
            "type": "line",
            "paint": { "line-color": "#f00" },
            "iconImageUrl": "http://icon.png"
        }))
        .unwrap();

        assert_eq!(descriptor.id, "roads");
        assert_eq!(descriptor.layer_type, LayerType::Line);
        assert_eq!(descriptor.icon_image_url.as_deref(), Some("http://icon.png"));
        assert!(descriptor.on.is_none());
    }

    #[test]
    fn test_layer_type_display() {
        assert_eq!(LayerType::FillExtrusion.to_string(), "fill-extrusion");
        assert_eq!(LayerType::Line.to_string(), "line");
        assert_eq!(LayerEventType::DblClick.to_string(), "dblclick");
    }
}
