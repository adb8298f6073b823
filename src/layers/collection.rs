use futures::StreamExt;

use crate::{
    core::{engine::MapEngine, map::MapHandle},
    layers::{
        added::{status_channel, AddedSet, LayerStatus, StatusMessage, StatusReceiver, StatusSender},
        descriptor::LayerDescriptor,
        stack::LayerStack,
        unit::{LayerUnit, UnitPhase},
    },
    prelude::{HashMap, HashSet},
    MapError, Result,
};

/// Observer of every status change, in the order the collection applies them.
pub type StatusListener = Box<dyn FnMut(&str, LayerStatus) + Send>;

/// For each position, the identity declared right after it, which is the
/// layer that must be drawn directly above it.
pub fn before_ids<S: AsRef<str>>(ids: &[S]) -> Vec<Option<String>> {
    (0..ids.len())
        .map(|i| ids.get(i + 1).map(|next| next.as_ref().to_string()))
        .collect()
}

/// Owns an ordered set of declared layers and keeps the engine in step with
/// it.
///
/// Layers are declared bottom to top. Each one gets a [`LayerUnit`]; the
/// collection feeds every unit the identity it should sit below and the set
/// of layers the engine has confirmed, and folds the units' status reports
/// back into that set. Having more than one collection on a map is allowed,
/// but each one orders only its own layers.
pub struct LayerCollection {
    map: MapHandle,
    /// Declared identities, bottom to top.
    order: Vec<String>,
    units: HashMap<String, LayerUnit>,
    added: AddedSet,
    /// Where this collection's layers currently sit in the engine.
    placed: LayerStack,
    status_tx: StatusSender,
    status_rx: StatusReceiver,
    listener: Option<StatusListener>,
}

impl LayerCollection {
    pub fn new(map: MapHandle) -> Self {
        let (status_tx, status_rx) = status_channel();
        Self {
            map,
            order: Vec::new(),
            units: HashMap::default(),
            added: AddedSet::new(),
            placed: LayerStack::new(),
            status_tx,
            status_rx,
            listener: None,
        }
    }

    pub fn with_status_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&str, LayerStatus) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn map(&self) -> &MapHandle {
        &self.map
    }

    /// Declared identities, bottom to top.
    pub fn declared(&self) -> &[String] {
        &self.order
    }

    pub fn added_layers(&self) -> &AddedSet {
        &self.added
    }

    pub fn unit(&self, id: &str) -> Option<&LayerUnit> {
        self.units.get(id)
    }

    /// The identity declared directly above `id`.
    pub fn before_id(&self, id: &str) -> Option<&str> {
        let index = self.order.iter().position(|declared| declared == id)?;
        self.order.get(index + 1).map(String::as_str)
    }

    /// This collection's layers in engine order, bottom to top.
    pub fn placed(&self) -> Vec<String> {
        self.placed.ids()
    }

    /// Declares the layers the map should show, bottom to top.
    ///
    /// Identities are validated before anything reaches the engine. Layers
    /// that disappeared are removed, changed layers are updated in place or
    /// re-added, new layers start registering. Registrations finish in the
    /// background; call [`LayerCollection::settle`] to wait for them.
    pub fn set_layers(&mut self, layers: Vec<LayerDescriptor>) -> Result<()> {
        validate(&layers)?;
        let engine = self.map.engine().ok();
        let next: Vec<String> = layers.iter().map(|layer| layer.id.clone()).collect();

        let departed: Vec<String> = self
            .order
            .iter()
            .filter(|id| !next.contains(id))
            .cloned()
            .collect();
        for id in departed {
            if let Some(mut unit) = self.units.remove(&id) {
                if let Some(engine) = &engine {
                    unit.teardown(engine.as_ref(), &self.status_tx)?;
                }
            }
        }

        for descriptor in layers {
            match self.units.get_mut(&descriptor.id) {
                Some(unit) => match &engine {
                    Some(engine) => {
                        unit.update(descriptor, engine.as_ref(), &self.status_tx)?;
                    }
                    // Units cannot register before the map is ready.
                    None => *unit = LayerUnit::new(descriptor),
                },
                None => {
                    self.units
                        .insert(descriptor.id.clone(), LayerUnit::new(descriptor));
                }
            }
        }

        self.order = next;
        self.reconcile()
    }

    /// Starts pending registrations, folds in the status reports received so
    /// far and brings order, visibility and listeners up to date. Does
    /// nothing until the map is ready.
    pub fn reconcile(&mut self) -> Result<()> {
        let Ok(engine) = self.map.engine() else {
            return Ok(());
        };

        self.drain_status()?;
        for id in &self.order {
            if let Some(unit) = self.units.get_mut(id) {
                unit.register(engine.clone(), self.status_tx.clone());
            }
        }
        self.apply(engine.as_ref())
    }

    /// Waits for the map to become ready and for every registration in
    /// flight to land, reconciling after each report.
    pub async fn settle(&mut self) -> Result<()> {
        self.map.wait_ready().await?;
        self.reconcile()?;

        while self.has_registrations_in_flight() {
            let Some(message) = self.status_rx.next().await else {
                break;
            };
            self.handle_status(message)?;
            self.reconcile()?;
        }
        Ok(())
    }

    /// Removes every layer and cancels registrations still in flight.
    pub fn unmount(&mut self) -> Result<()> {
        let engine = self.map.engine().ok();
        let order = std::mem::take(&mut self.order);

        let mut result = Ok(());
        for id in order.iter().rev() {
            let Some(mut unit) = self.units.remove(id) else {
                continue;
            };
            if let Some(engine) = &engine {
                if let Err(e) = unit.teardown(engine.as_ref(), &self.status_tx) {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        self.units.clear();

        let drained = self.drain_status();
        result.and(drained)
    }

    fn has_registrations_in_flight(&self) -> bool {
        self.units.values().any(|unit| match unit.phase() {
            UnitPhase::Active => true,
            // Added, but the report has not been folded in yet.
            UnitPhase::Complete => !self.added.contains(unit.id()),
            UnitPhase::Pending => false,
        })
    }

    fn drain_status(&mut self) -> Result<()> {
        while let Ok(Some(message)) = self.status_rx.try_next() {
            self.handle_status(message)?;
        }
        Ok(())
    }

    fn handle_status(&mut self, message: StatusMessage) -> Result<()> {
        match message {
            StatusMessage::Changed { id, status } => {
                if self.added.apply(&id, status) {
                    match status {
                        LayerStatus::Added => {
                            self.placed.push(id.clone(), ());
                        }
                        LayerStatus::Removed => {
                            self.placed.remove(&id);
                        }
                    }
                }
                log::debug!("layers: `{id}` {status}");
                if let Some(listener) = self.listener.as_mut() {
                    listener(&id, status);
                }
            }
            StatusMessage::Aborted { id } => {
                log::debug!("layers: registration of `{id}` aborted");
            }
            StatusMessage::Failed { id, error } => {
                log::debug!("layers: engine rejected `{id}`");
                return Err(error);
            }
        }
        Ok(())
    }

    fn apply(&mut self, engine: &dyn MapEngine) -> Result<()> {
        for id in &self.order {
            if let Some(unit) = self.units.get_mut(id) {
                unit.sync_events(engine);
                unit.sync_visibility(engine)?;
            }
        }

        // Top down: once a layer is placed below its neighbour, the layers
        // handled after it are placed below it, building the chain downward.
        let before_ids = before_ids(&self.order);
        for (index, id) in self.order.iter().enumerate().rev() {
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            let before_id = before_ids[index].as_deref();
            let displaced = before_id.is_some_and(|before| {
                self.placed.contains(id)
                    && self.placed.contains(before)
                    && !self.placed.is_directly_below(id, before)
            });
            if unit.reorder(engine, before_id, &self.added, displaced)? {
                if let Some(before) = before_id {
                    self.placed.move_before(id, before);
                }
            }
        }
        Ok(())
    }
}

impl Drop for LayerCollection {
    fn drop(&mut self) {
        if self.units.is_empty() {
            return;
        }
        if let Err(e) = self.unmount() {
            log::warn!("layers: teardown on drop failed: {e}");
        }
    }
}

fn validate(layers: &[LayerDescriptor]) -> Result<()> {
    let mut seen = HashSet::default();
    for (index, layer) in layers.iter().enumerate() {
        if layer.id.is_empty() {
            return Err(MapError::MissingLayerId { index });
        }
        if !seen.insert(layer.id.as_str()) {
            return Err(MapError::DuplicateLayerId(layer.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::descriptor::LayerType;

    #[test]
    fn test_before_ids_follow_declared_order() {
        assert_eq!(
            before_ids(&["A", "B", "C"]),
            vec![Some("B".to_string()), Some("C".to_string()), None]
        );
        assert_eq!(before_ids(&["A"]), vec![None]);
        assert!(before_ids::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_validate_rejects_missing_id() {
        let layers = vec![
            LayerDescriptor::new("1", LayerType::Line),
            LayerDescriptor::new("", LayerType::Line),
        ];
        assert!(matches!(
            validate(&layers),
            Err(MapError::MissingLayerId { index: 1 })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let layers = vec![
            LayerDescriptor::new("1", LayerType::Line),
            LayerDescriptor::new("1", LayerType::Fill),
        ];
        assert!(matches!(
            validate(&layers),
            Err(MapError::DuplicateLayerId(id)) if id == "1"
        ));
    }
}
