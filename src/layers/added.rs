//! The added-set and the status protocol that feeds it.
//!
//! A layer is *declared* as soon as it appears in a collection, but only
//! *added* once the engine confirmed it. Units report their transitions as
//! [`StatusMessage`]s; the collection folds them into its [`AddedSet`] with
//! [`AddedSet::apply`] and nothing else mutates the set.

use futures::channel::mpsc;
use serde::Serialize;

use crate::MapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerStatus {
    Added,
    Removed,
}

impl std::fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerStatus::Added => write!(f, "added"),
            LayerStatus::Removed => write!(f, "removed"),
        }
    }
}

/// What a unit reports upward.
#[derive(Debug)]
pub enum StatusMessage {
    /// The layer entered or left the engine.
    Changed { id: String, status: LayerStatus },
    /// A registration ended without adding the layer because its unit was
    /// torn down first.
    Aborted { id: String },
    /// The engine rejected the layer.
    Failed { id: String, error: MapError },
}

impl StatusMessage {
    pub fn id(&self) -> &str {
        match self {
            StatusMessage::Changed { id, .. }
            | StatusMessage::Aborted { id }
            | StatusMessage::Failed { id, .. } => id,
        }
    }
}

pub type StatusSender = mpsc::UnboundedSender<StatusMessage>;
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusMessage>;

pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::unbounded()
}

/// Identities confirmed present in the engine, in confirmation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddedSet {
    ids: Vec<String>,
}

impl AddedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one status change into the set. Returns whether membership
    /// changed; re-adding a present id or removing an absent one does not.
    pub fn apply(&mut self, id: &str, status: LayerStatus) -> bool {
        match status {
            LayerStatus::Added => {
                if self.contains(id) {
                    return false;
                }
                self.ids.push(id.to_string());
                true
            }
            LayerStatus::Removed => {
                let before = self.ids.len();
                self.ids.retain(|added| added != id);
                self.ids.len() != before
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|added| added == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.ids.clone()
    }
}

impl<'a> FromIterator<&'a str> for AddedSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = AddedSet::new();
        for id in iter {
            set.apply(id, LayerStatus::Added);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_is_idempotent() {
        let mut added = AddedSet::new();
        assert!(added.apply("1", LayerStatus::Added));
        assert!(added.apply("2", LayerStatus::Added));

        assert!(!added.apply("1", LayerStatus::Added));
        assert_eq!(added.len(), 2);
        assert_eq!(added.to_vec(), vec!["1", "2"]);
    }

    #[test]
    fn test_removed_is_idempotent() {
        let mut added: AddedSet = ["1", "2", "3"].into_iter().collect();

        assert!(added.apply("2", LayerStatus::Removed));
        assert!(!added.apply("2", LayerStatus::Removed));
        assert!(!added.apply("9", LayerStatus::Removed));
        assert_eq!(added.to_vec(), vec!["1", "3"]);
    }

    #[test]
    fn test_keeps_confirmation_order() {
        let mut added = AddedSet::new();
        added.apply("3", LayerStatus::Added);
        added.apply("1", LayerStatus::Added);
        added.apply("3", LayerStatus::Removed);
        added.apply("3", LayerStatus::Added);

        assert_eq!(added.iter().collect::<Vec<_>>(), vec!["1", "3"]);
        assert!(added.contains("1"));
        assert!(!added.contains("2"));
    }

    #[test]
    fn test_status_message_id() {
        let message = StatusMessage::Aborted {
            id: "LAYER_1".to_string(),
        };
        assert_eq!(message.id(), "LAYER_1");
        assert_eq!(LayerStatus::Removed.to_string(), "removed");
    }
}
