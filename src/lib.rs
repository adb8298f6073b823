//! # remaplet
//!
//! Declarative layer reconciliation for imperative map engines.
//!
//! An application describes the layers it wants as an ordered list of
//! [`LayerDescriptor`]s. A [`LayerCollection`] diffs that list against what the
//! engine actually holds and drives one registration unit per layer, issuing
//! add/remove/move calls against a [`MapEngine`] so the engine's layer stack
//! follows the declared order.

pub mod core;
pub mod layers;
pub mod prelude;
pub mod runtime;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::MapOptions,
    engine::{EngineFactory, MapEngine, MapSignal},
    geo::LngLat,
    headless::{HeadlessEngine, HeadlessFactory},
    map::{Container, MapHandle},
    scope::MapScope,
};

pub use crate::layers::{
    added::{AddedSet, LayerStatus},
    collection::LayerCollection,
    descriptor::{LayerDescriptor, LayerEventType, LayerType, Visibility},
    order::LayerOrderRegistry,
    unit::LayerUnit,
};

pub use crate::ui::{
    controls::{ControlKind, ControlManager, MapControl},
    marker::Marker,
    popup::MapPopup,
    render_target::RenderTarget,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("a map has already been created for this map handle")]
    MapAlreadyCreated,

    #[error("layer at index {index} does not have the required `id`")]
    MissingLayerId { index: usize },

    #[error("layer id `{0}` is declared more than once")]
    DuplicateLayerId(String),

    #[error("the map is not ready")]
    NotReady,

    #[error("stylesheet `{url}` failed to load: {reason}")]
    Stylesheet { url: String, reason: String },

    #[error("map signal `{0}` was dropped before it fired")]
    SignalDropped(MapSignal),

    #[error("image `{url}` failed to load: {reason}")]
    ImageLoad { url: String, reason: String },

    #[error("layer `{0}` does not exist")]
    UnknownLayer(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs an `env_logger` logger filtered by `RUST_LOG`, showing this
/// crate's debug output by default. Does nothing if a logger is already set.
#[cfg(feature = "debug")]
pub fn init_debug_logging() {
    let env = env_logger::Env::default().default_filter_or("remaplet=debug");
    let _ = env_logger::Builder::from_env(env).try_init();
}
