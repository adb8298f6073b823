use serde::{Deserialize, Serialize};

use crate::{
    core::{
        engine::{CloseListener, MapEngine, PopupId},
        geo::{LngLat, Offset},
    },
    ui::render_target::RenderTarget,
    Result,
};

/// Side of the popup that points at its anchor coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopupAnchor {
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopupOptions {
    pub class_name: Option<String>,
    pub close_button: bool,
    pub close_on_click: bool,
    /// CSS length, e.g. `"240px"` or `"none"`.
    pub max_width: String,
    pub offset: Offset,
    /// Picked by the engine from the available space when unset.
    pub anchor: Option<PopupAnchor>,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            class_name: None,
            close_button: true,
            close_on_click: true,
            max_width: "240px".to_string(),
            offset: Offset::default(),
            anchor: None,
        }
    }
}

/// A popup shown directly on the map.
///
/// The content lives in a [`RenderTarget`] the engine adopts. The engine
/// popup is created once and positioned separately, so moving the popup
/// does not recreate it; changing its options does.
pub struct MapPopup {
    lng_lat: LngLat,
    options: PopupOptions,
    content: RenderTarget,
    on_close: Option<CloseListener>,
    id: Option<PopupId>,
    /// Position last pushed to the engine.
    placed_at: Option<LngLat>,
}

impl std::fmt::Debug for MapPopup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapPopup")
            .field("lng_lat", &self.lng_lat)
            .field("options", &self.options)
            .field("content", &self.content.id())
            .field("id", &self.id)
            .finish()
    }
}

impl MapPopup {
    pub fn new(lng_lat: impl Into<LngLat>, content: RenderTarget) -> Self {
        Self {
            lng_lat: lng_lat.into(),
            options: PopupOptions::default(),
            content,
            on_close: None,
            id: None,
            placed_at: None,
        }
    }

    pub fn with_options(mut self, options: PopupOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_on_close<F>(mut self, on_close: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_close = Some(std::sync::Arc::new(on_close));
        self
    }

    pub fn id(&self) -> Option<PopupId> {
        self.id
    }

    pub fn lng_lat(&self) -> LngLat {
        self.lng_lat
    }

    pub fn options(&self) -> &PopupOptions {
        &self.options
    }

    pub fn content(&self) -> &RenderTarget {
        &self.content
    }

    /// Adds the popup to the map at its coordinate.
    pub fn mount(&mut self, engine: &dyn MapEngine) -> Result<()> {
        if self.id.is_none() {
            self.id = Some(engine.add_popup(
                &self.options,
                &self.content,
                self.on_close.clone(),
            )?);
            log::debug!("popup[{}]: added", self.content.id());
        }
        self.place(engine)
    }

    /// Moves the popup. The engine is only told when the coordinate changed.
    pub fn set_lng_lat(&mut self, engine: &dyn MapEngine, lng_lat: impl Into<LngLat>) -> Result<bool> {
        self.lng_lat = lng_lat.into();
        if self.placed_at == Some(self.lng_lat) {
            return Ok(false);
        }
        self.place(engine)?;
        Ok(self.id.is_some())
    }

    /// Replaces the options, recreating the engine popup if it is mounted.
    pub fn set_options(&mut self, engine: &dyn MapEngine, options: PopupOptions) -> Result<()> {
        if self.options == options {
            return Ok(());
        }
        self.options = options;
        if self.id.is_some() {
            self.unmount(engine)?;
            self.mount(engine)?;
        }
        Ok(())
    }

    pub fn unmount(&mut self, engine: &dyn MapEngine) -> Result<()> {
        self.placed_at = None;
        if let Some(id) = self.id.take() {
            engine.remove_popup(id)?;
            log::debug!("popup[{}]: removed", self.content.id());
        }
        Ok(())
    }

    /// Creates the engine popup without placing it, for popups a marker
    /// positions.
    pub(crate) fn attach(&mut self, engine: &dyn MapEngine) -> Result<PopupId> {
        if let Some(id) = self.id {
            return Ok(id);
        }
        let id = engine.add_popup(&self.options, &self.content, self.on_close.clone())?;
        self.id = Some(id);
        Ok(id)
    }

    fn place(&mut self, engine: &dyn MapEngine) -> Result<()> {
        let Some(id) = self.id else {
            return Ok(());
        };
        engine.set_popup_lng_lat(id, self.lng_lat)?;
        self.placed_at = Some(self.lng_lat);
        Ok(())
    }
}
