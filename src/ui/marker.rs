use serde::{Deserialize, Serialize};

use crate::{
    core::{
        engine::{MapEngine, MarkerId},
        geo::{LngLat, Offset},
    },
    ui::{popup::MapPopup, render_target::RenderTarget},
    Result,
};

/// Whether a marker follows the map plane or faces the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Map,
    Viewport,
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerOptions {
    pub lng_lat: LngLat,
    #[serde(default)]
    pub draggable: bool,
    #[serde(default)]
    pub offset: Offset,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub pitch_alignment: Alignment,
    #[serde(default)]
    pub rotation_alignment: Alignment,
    /// Color of the default pin. Ignored for markers with custom content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl MarkerOptions {
    pub fn new(lng_lat: impl Into<LngLat>) -> Self {
        Self {
            lng_lat: lng_lat.into(),
            draggable: false,
            offset: Offset::default(),
            rotation: 0.0,
            pitch_alignment: Alignment::Auto,
            rotation_alignment: Alignment::Auto,
            color: None,
        }
    }

    pub fn with_draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// True when the options differ in anything besides the position.
    fn appearance_differs(&self, other: &MarkerOptions) -> bool {
        self.draggable != other.draggable
            || self.offset != other.offset
            || self.rotation != other.rotation
            || self.pitch_alignment != other.pitch_alignment
            || self.rotation_alignment != other.rotation_alignment
            || self.color != other.color
    }
}

/// A marker pinned to a coordinate, optionally with custom content and a
/// popup that opens when the marker is clicked.
#[derive(Debug)]
pub struct Marker {
    options: MarkerOptions,
    element: Option<RenderTarget>,
    popup: Option<MapPopup>,
    id: Option<MarkerId>,
}

impl Marker {
    pub fn new(options: MarkerOptions) -> Self {
        Self {
            options,
            element: None,
            popup: None,
            id: None,
        }
    }

    /// Uses `element` as the marker content instead of the default pin.
    pub fn with_element(mut self, element: RenderTarget) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_popup(mut self, popup: MapPopup) -> Self {
        self.popup = Some(popup);
        self
    }

    pub fn id(&self) -> Option<MarkerId> {
        self.id
    }

    pub fn options(&self) -> &MarkerOptions {
        &self.options
    }

    pub fn popup(&self) -> Option<&MapPopup> {
        self.popup.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.id.is_some()
    }

    pub fn mount(&mut self, engine: &dyn MapEngine) -> Result<()> {
        if self.id.is_some() {
            return Ok(());
        }
        let id = engine.add_marker(&self.options, self.element.as_ref())?;
        self.id = Some(id);
        log::debug!("marker: added at {}", self.options.lng_lat);
        self.attach_popup(engine, id)
    }

    /// Forwards option changes. The position and the remaining options are
    /// pushed separately, each only when it changed.
    pub fn update(&mut self, engine: &dyn MapEngine, next: MarkerOptions) -> Result<()> {
        if let Some(id) = self.id {
            if next.lng_lat != self.options.lng_lat {
                engine.set_marker_lng_lat(id, next.lng_lat)?;
            }
            if next.appearance_differs(&self.options) {
                engine.update_marker(id, &next)?;
            }
        }
        self.options = next;
        Ok(())
    }

    /// Replaces the marker popup, detaching the current one first.
    pub fn set_popup(&mut self, engine: &dyn MapEngine, popup: Option<MapPopup>) -> Result<()> {
        self.detach_popup(engine)?;
        self.popup = popup;
        match self.id {
            Some(id) => self.attach_popup(engine, id),
            None => Ok(()),
        }
    }

    pub fn unmount(&mut self, engine: &dyn MapEngine) -> Result<()> {
        self.detach_popup(engine)?;
        if let Some(id) = self.id.take() {
            engine.remove_marker(id)?;
            log::debug!("marker: removed");
        }
        Ok(())
    }

    fn attach_popup(&mut self, engine: &dyn MapEngine, marker: MarkerId) -> Result<()> {
        if let Some(popup) = self.popup.as_mut() {
            let popup_id = popup.attach(engine)?;
            engine.set_marker_popup(marker, Some(popup_id))?;
        }
        Ok(())
    }

    fn detach_popup(&mut self, engine: &dyn MapEngine) -> Result<()> {
        let Some(popup) = self.popup.as_mut() else {
            return Ok(());
        };
        if popup.id().is_none() {
            return Ok(());
        }
        if let Some(id) = self.id {
            engine.set_marker_popup(id, None)?;
        }
        popup.unmount(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appearance_ignores_position() {
        let options = MarkerOptions::new((-68.2, 44.3));
        let moved = MarkerOptions::new((-68.0, 44.0));
        assert!(!options.appearance_differs(&moved));
        assert!(options.appearance_differs(&moved.clone().with_rotation(45.0)));
        assert!(options.appearance_differs(&moved.with_color("#ff0000")));
    }

    #[test]
    fn test_marker_options_from_json() {
        let options: MarkerOptions = serde_json::from_str(
            r#"{ "lngLat": { "lng": -68.2, "lat": 44.3 }, "draggable": true }"#,
        )
        .unwrap();
        assert!(options.draggable);
        assert_eq!(options.pitch_alignment, Alignment::Auto);
        assert_eq!(options.lng_lat, LngLat::new(-68.2, 44.3));
    }
}
