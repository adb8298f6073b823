//! Prelude module for common remaplet types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use remaplet::prelude::*;`

pub use crate::core::{
    builder::MapBuilder,
    config::MapOptions,
    engine::{EngineFactory, EventListener, MapEngine, MapEvent, MapImage, MapSignal},
    geo::{LngLat, Offset},
    headless::{EngineCall, HeadlessEngine, HeadlessFactory},
    map::{Container, MapHandle},
    scope::MapScope,
};

pub use crate::layers::{
    added::{AddedSet, LayerStatus},
    collection::LayerCollection,
    descriptor::{LayerDescriptor, LayerEventType, LayerEvents, LayerType, Visibility},
    order::LayerOrderRegistry,
    unit::{LayerUnit, UnitPhase},
};

pub use crate::ui::{
    controls::{ControlKind, ControlManager, ControlPosition, MapControl},
    marker::{Marker, MarkerOptions},
    popup::{MapPopup, PopupOptions},
    render_target::RenderTarget,
};

pub use crate::runtime::{spawn, AsyncHandle, AsyncSpawner};

pub use crate::{Error as MapError, Result};

pub use std::{pin::Pin, sync::Arc};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
