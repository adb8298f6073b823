//! One declared layer's lifecycle against the engine.
//!
//! ```text
//! Pending --register--> Active --add_layer ok--> Complete
//!    ^                    |                         |
//!    +----teardown--------+---------teardown--------+
//! ```
//!
//! Registration runs as a spawned task (icon loading may suspend it). The
//! unit and its task share a [`Registration`] guarded by a mutex: teardown
//! bumps the generation under the lock, and the task checks the generation
//! under the same lock right before calling `add_layer`. A torn-down unit
//! therefore never has its layer added behind its back, and a layer is only
//! removed if its add went through.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::{
    core::{constants::VISIBILITY_PROPERTY, engine::MapEngine},
    layers::{
        added::{AddedSet, LayerStatus, StatusMessage, StatusSender},
        descriptor::{LayerDescriptor, LayerEvents, Visibility},
        icon::ensure_icon_image,
    },
    runtime::{self, AsyncHandle},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitPhase {
    /// Not in the engine and no registration running.
    Pending,
    /// Registration task in flight.
    Active,
    /// The engine holds the layer.
    Complete,
}

#[derive(Debug)]
struct Registration {
    phase: UnitPhase,
    generation: u64,
}

fn lock(registration: &Mutex<Registration>) -> MutexGuard<'_, Registration> {
    registration
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct LayerUnit {
    descriptor: LayerDescriptor,
    registration: Arc<Mutex<Registration>>,
    task: Option<Box<dyn AsyncHandle>>,
    /// Neighbour this layer was last moved below.
    before_id: Option<String>,
    /// Visibility last pushed to the engine.
    visibility: Option<Visibility>,
    bound: Option<LayerEvents>,
}

impl std::fmt::Debug for LayerUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerUnit")
            .field("id", &self.descriptor.id)
            .field("phase", &self.phase())
            .field("before_id", &self.before_id)
            .field("visibility", &self.visibility)
            .finish()
    }
}

impl LayerUnit {
    pub fn new(descriptor: LayerDescriptor) -> Self {
        Self {
            descriptor,
            registration: Arc::new(Mutex::new(Registration {
                phase: UnitPhase::Pending,
                generation: 0,
            })),
            task: None,
            before_id: None,
            visibility: None,
            bound: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }

    pub fn phase(&self) -> UnitPhase {
        lock(&self.registration).phase
    }

    /// The neighbour this layer was last placed below.
    pub fn before_id(&self) -> Option<&str> {
        self.before_id.as_deref()
    }

    /// Starts adding the layer. Does nothing unless the unit is pending, so
    /// calling it again while a registration is running or after it finished
    /// is harmless.
    pub fn register(&mut self, engine: Arc<dyn MapEngine>, status: StatusSender) -> bool {
        let generation = {
            let mut registration = lock(&self.registration);
            if registration.phase != UnitPhase::Pending {
                return false;
            }
            registration.phase = UnitPhase::Active;
            registration.generation
        };

        log::debug!("layer[{}]: registering", self.id());
        let task = run_registration(
            engine,
            self.descriptor.clone(),
            self.registration.clone(),
            generation,
            status,
        );
        self.task = Some(runtime::spawn(task));
        true
    }

    /// Replaces the descriptor. If the change affects what the engine was
    /// given at add time the layer is torn down first and `true` is returned;
    /// the unit is then pending and needs to be registered again.
    pub fn update(
        &mut self,
        next: LayerDescriptor,
        engine: &dyn MapEngine,
        status: &StatusSender,
    ) -> Result<bool> {
        let readd = self.descriptor.requires_readd(&next);
        if readd {
            log::debug!("layer[{}]: definition changed, re-adding", self.id());
            self.teardown(engine, status)?;
        }
        self.descriptor = next;
        Ok(readd)
    }

    /// Takes the layer out of the engine, or cancels its registration if the
    /// add has not happened yet.
    ///
    /// A layer that was in the engine always reports `Removed`, even when
    /// one of the remove calls fails; the first failure is returned.
    pub fn teardown(&mut self, engine: &dyn MapEngine, status: &StatusSender) -> Result<()> {
        self.unbind_events(engine);

        let mut registration = lock(&self.registration);
        let previous = registration.phase;
        registration.generation += 1;
        registration.phase = UnitPhase::Pending;

        // Reported under the lock so `Removed` never overtakes the task's `Added`.
        let removed = match previous {
            UnitPhase::Complete => {
                let id = self.descriptor.id.clone();
                let layer = engine.remove_layer(&id);
                let source = engine.remove_source(&id);
                log::debug!("layer[{id}]: removed");
                let _ = status.unbounded_send(StatusMessage::Changed {
                    id,
                    status: LayerStatus::Removed,
                });
                layer.and(source)
            }
            UnitPhase::Active => {
                log::debug!("layer[{}]: registration cancelled", self.descriptor.id);
                Ok(())
            }
            UnitPhase::Pending => Ok(()),
        };
        drop(registration);

        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                task.cancel();
            }
        }
        self.before_id = None;
        self.visibility = None;
        removed
    }

    /// Moves the layer directly below `before_id` when that is both needed
    /// and possible. Returns whether a move was issued.
    ///
    /// Nothing happens if `before_id` is unchanged since the last move (unless
    /// `displaced` says the layer no longer sits there), if there is no
    /// neighbour above, or if either layer is not in `added` yet.
    pub fn reorder(
        &mut self,
        engine: &dyn MapEngine,
        before_id: Option<&str>,
        added: &AddedSet,
        displaced: bool,
    ) -> Result<bool> {
        let Some(before_id) = before_id else {
            self.before_id = None;
            return Ok(false);
        };
        if self.before_id.as_deref() == Some(before_id) && !displaced {
            return Ok(false);
        }
        if !added.contains(before_id) || !added.contains(self.id()) {
            return Ok(false);
        }

        engine.move_layer(self.id(), before_id)?;
        log::debug!("layer[{}]: moved below `{before_id}`", self.id());
        self.before_id = Some(before_id.to_string());
        Ok(true)
    }

    /// Pushes the declared visibility (default visible) if it differs from
    /// what the engine was last told.
    pub fn sync_visibility(&mut self, engine: &dyn MapEngine) -> Result<()> {
        if self.phase() != UnitPhase::Complete {
            return Ok(());
        }
        let visibility = self.descriptor.visibility().unwrap_or_default();
        if self.visibility == Some(visibility) {
            return Ok(());
        }
        engine.set_layout_property(
            self.id(),
            VISIBILITY_PROPERTY,
            Value::from(visibility.as_str()),
        )?;
        self.visibility = Some(visibility);
        Ok(())
    }

    /// Binds the declared listeners once the layer exists, rebinding when
    /// the descriptor carries a different listener set.
    pub fn sync_events(&mut self, engine: &dyn MapEngine) {
        if self.phase() != UnitPhase::Complete {
            return;
        }
        let unchanged = match (&self.bound, &self.descriptor.on) {
            (Some(bound), Some(declared)) => bound.ptr_eq(declared),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        self.unbind_events(engine);
        if let Some(events) = self.descriptor.on.clone() {
            for (event_type, listener) in events.iter() {
                engine.on(*event_type, &self.descriptor.id, listener);
            }
            self.bound = Some(events);
        }
    }

    fn unbind_events(&mut self, engine: &dyn MapEngine) {
        if let Some(events) = self.bound.take() {
            for (event_type, listener) in events.iter() {
                engine.off(*event_type, &self.descriptor.id, listener);
            }
        }
    }
}

impl Drop for LayerUnit {
    fn drop(&mut self) {
        let mut registration = lock(&self.registration);
        if registration.phase == UnitPhase::Active {
            registration.generation += 1;
            registration.phase = UnitPhase::Pending;
        }
        drop(registration);

        if let Some(task) = self.task.take() {
            task.cancel();
        }
    }
}

async fn run_registration(
    engine: Arc<dyn MapEngine>,
    descriptor: LayerDescriptor,
    registration: Arc<Mutex<Registration>>,
    generation: u64,
    status: StatusSender,
) {
    let id = descriptor.id.clone();

    if let Some(icon) = descriptor.symbol_icon() {
        if let Err(e) = ensure_icon_image(engine.as_ref(), &icon).await {
            log::warn!(
                "layer[{id}]: icon `{}` unavailable, adding without it: {e}",
                icon.image_id
            );
        }
    }

    let mut guard = lock(&registration);
    let message = if guard.generation != generation || guard.phase != UnitPhase::Active
    {
        StatusMessage::Aborted { id }
    } else {
        match engine.add_layer(&descriptor.to_spec()) {
            Ok(()) => {
                guard.phase = UnitPhase::Complete;
                log::debug!("layer[{id}]: added");
                StatusMessage::Changed {
                    id,
                    status: LayerStatus::Added,
                }
            }
            Err(error) => {
                guard.phase = UnitPhase::Pending;
                StatusMessage::Failed { id, error }
            }
        }
    };
    // Still holding the lock: a teardown that sees `Complete` reports after this.
    let _ = status.unbounded_send(message);
}
