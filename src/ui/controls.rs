use serde::{Deserialize, Serialize};

use crate::{
    core::{
        engine::{ControlId, MapEngine},
        map::MapHandle,
    },
    prelude::HashMap,
    Result,
};

/// Corner of the map a control is docked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationOptions {
    pub show_compass: bool,
    pub show_zoom: bool,
    pub visualize_pitch: bool,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            show_compass: true,
            show_zoom: true,
            visualize_pitch: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleUnit {
    Imperial,
    #[default]
    Metric,
    Nautical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleOptions {
    pub max_width: u32,
    pub unit: ScaleUnit,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            max_width: 100,
            unit: ScaleUnit::Metric,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeolocateOptions {
    pub track_user_location: bool,
    pub show_accuracy_circle: bool,
    pub show_user_location: bool,
    /// Passed through to the platform geolocation API.
    pub position_options: Option<serde_json::Value>,
    pub fit_bounds_options: Option<serde_json::Value>,
}

impl Default for GeolocateOptions {
    fn default() -> Self {
        Self {
            track_user_location: false,
            show_accuracy_circle: true,
            show_user_location: true,
            position_options: None,
            fit_bounds_options: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributionOptions {
    pub compact: Option<bool>,
    pub custom_attribution: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FullscreenOptions {
    /// Element to make fullscreen instead of the map container.
    pub container: Option<String>,
}

/// The engine controls this crate knows how to mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlKind {
    Navigation(NavigationOptions),
    Scale(ScaleOptions),
    Geolocate(GeolocateOptions),
    Attribution(AttributionOptions),
    Fullscreen(FullscreenOptions),
}

impl ControlKind {
    pub fn name(&self) -> &'static str {
        match self {
            ControlKind::Navigation(_) => "navigation",
            ControlKind::Scale(_) => "scale",
            ControlKind::Geolocate(_) => "geolocate",
            ControlKind::Attribution(_) => "attribution",
            ControlKind::Fullscreen(_) => "fullscreen",
        }
    }
}

/// A control mounted on the map. Option changes are forwarded by replacing
/// the engine control, since engine controls take their options at
/// construction.
#[derive(Debug)]
pub struct MapControl {
    kind: ControlKind,
    position: ControlPosition,
    id: Option<ControlId>,
}

impl MapControl {
    pub fn new(kind: ControlKind, position: ControlPosition) -> Self {
        Self {
            kind,
            position,
            id: None,
        }
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    pub fn position(&self) -> ControlPosition {
        self.position
    }

    pub fn is_mounted(&self) -> bool {
        self.id.is_some()
    }

    pub fn mount(&mut self, engine: &dyn MapEngine) -> Result<()> {
        if self.id.is_some() {
            return Ok(());
        }
        self.id = Some(engine.add_control(&self.kind, self.position)?);
        log::debug!("control[{}]: added at {:?}", self.kind.name(), self.position);
        Ok(())
    }

    /// Applies new options. Returns whether the engine control was replaced.
    pub fn update(
        &mut self,
        engine: &dyn MapEngine,
        kind: ControlKind,
        position: ControlPosition,
    ) -> Result<bool> {
        if self.kind == kind && self.position == position {
            return Ok(false);
        }
        let mounted = self.is_mounted();
        self.unmount(engine)?;
        self.kind = kind;
        self.position = position;
        if mounted {
            self.mount(engine)?;
        }
        Ok(mounted)
    }

    pub fn unmount(&mut self, engine: &dyn MapEngine) -> Result<()> {
        if let Some(id) = self.id.take() {
            engine.remove_control(id)?;
            log::debug!("control[{}]: removed", self.kind.name());
        }
        Ok(())
    }
}

/// Control manager that handles all map controls, keyed by a caller-chosen
/// name.
pub struct ControlManager {
    map: MapHandle,
    controls: HashMap<String, MapControl>,
}

impl ControlManager {
    pub fn new(map: MapHandle) -> Self {
        Self {
            map,
            controls: HashMap::default(),
        }
    }

    /// Mounts a control under `name`, or forwards new options to the one
    /// already there.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        kind: ControlKind,
        position: ControlPosition,
    ) -> Result<()> {
        let engine = self.map.engine()?;
        let name = name.into();
        match self.controls.get_mut(&name) {
            Some(control) => {
                control.update(engine.as_ref(), kind, position)?;
            }
            None => {
                let mut control = MapControl::new(kind, position);
                control.mount(engine.as_ref())?;
                self.controls.insert(name, control);
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let Some(mut control) = self.controls.remove(name) else {
            return Ok(false);
        };
        control.unmount(self.map.engine()?.as_ref())?;
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<&MapControl> {
        self.controls.get(name)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Removes every control.
    pub fn clear(&mut self) -> Result<()> {
        let engine = self.map.engine()?;
        for (_, mut control) in self.controls.drain() {
            control.unmount(engine.as_ref())?;
        }
        Ok(())
    }
}

impl Drop for ControlManager {
    fn drop(&mut self) {
        if self.controls.is_empty() {
            return;
        }
        if let Err(e) = self.clear() {
            log::warn!("controls: teardown on drop failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_kind_serde() {
        let kind: ControlKind =
            serde_json::from_str(r#"{ "type": "scale", "maxWidth": 80, "unit": "imperial" }"#)
                .unwrap();
        assert_eq!(
            kind,
            ControlKind::Scale(ScaleOptions {
                max_width: 80,
                unit: ScaleUnit::Imperial,
            })
        );
        assert_eq!(kind.name(), "scale");
    }

    #[test]
    fn test_defaults() {
        let navigation = NavigationOptions::default();
        assert!(navigation.show_compass && navigation.show_zoom);
        assert!(!navigation.visualize_pitch);
        assert_eq!(ControlPosition::default(), ControlPosition::TopRight);
    }
}
