//! The map handle: owner of the single engine instance of a mounted root.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures::future;
use once_cell::sync::OnceCell;
use tokio::sync::watch;

use crate::{
    core::{
        config::MapOptions,
        engine::{EngineFactory, MapEngine, MapSignal},
        stylesheet,
    },
    MapError, Result,
};

/// The element a map renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Container {
    pub id: String,
}

impl Container {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

struct MapInner {
    options: MapOptions,
    factory: Arc<dyn EngineFactory>,
    created: AtomicBool,
    engine: OnceCell<Arc<dyn MapEngine>>,
    ready: watch::Sender<bool>,
}

/// Shared handle to one map. Clones refer to the same engine; components
/// mounted on the map only ever read it for call targeting.
#[derive(Clone)]
pub struct MapHandle {
    inner: Arc<MapInner>,
}

impl std::fmt::Debug for MapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapHandle")
            .field("options", &self.inner.options)
            .field("created", &self.inner.created.load(Ordering::SeqCst))
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl MapHandle {
    pub fn new(options: MapOptions, factory: Arc<dyn EngineFactory>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(MapInner {
                options,
                factory,
                created: AtomicBool::new(false),
                engine: OnceCell::new(),
                ready,
            }),
        }
    }

    pub fn options(&self) -> &MapOptions {
        &self.inner.options
    }

    /// Creates the engine bound to `container` and resolves once it is safe
    /// to use.
    ///
    /// May be called once per handle; a second call fails with
    /// [`MapError::MapAlreadyCreated`] regardless of whether the first one
    /// has finished.
    pub async fn attach_container(&self, container: Container) -> Result<()> {
        if self.inner.created.swap(true, Ordering::SeqCst) {
            return Err(MapError::MapAlreadyCreated);
        }

        let options = &self.inner.options;
        stylesheet::ensure_loaded(
            self.inner.factory.as_ref(),
            &options.stylesheet_id,
            &options.css_file,
        )
        .await?;

        let engine = self.inner.factory.create(&container, options)?;

        // Either signal may fire first, so both are awaited together.
        let (load, style_data) = future::join(
            engine.once(MapSignal::Load),
            engine.once(MapSignal::StyleData),
        )
        .await;
        load.map_err(|_| MapError::SignalDropped(MapSignal::Load))?;
        style_data.map_err(|_| MapError::SignalDropped(MapSignal::StyleData))?;

        if self.inner.engine.set(engine).is_err() {
            return Err(MapError::MapAlreadyCreated);
        }
        log::info!("map[{}]: resources loaded", container.id);
        self.inner.ready.send_replace(true);
        Ok(())
    }

    /// True once both readiness signals have fired. Never goes back to false.
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.inner.ready.subscribe()
    }

    pub async fn wait_ready(&self) -> Result<()> {
        let mut ready = self.subscribe_ready();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| MapError::NotReady)
    }

    /// The engine, once ready.
    pub fn engine(&self) -> Result<Arc<dyn MapEngine>> {
        match self.inner.engine.get() {
            Some(engine) if self.is_ready() => Ok(engine.clone()),
            _ => Err(MapError::NotReady),
        }
    }

    /// Registers a source shared by several layers, referenced from their
    /// descriptors by id.
    pub fn add_source(&self, id: &str, source: &serde_json::Value) -> Result<()> {
        self.engine()?.add_source(id, source)
    }

    pub fn remove_source(&self, id: &str) -> Result<()> {
        self.engine()?.remove_source(id)
    }
}
