//! Timestamp-ordered layer registry.
//!
//! Orders layers by when their position was last asserted instead of by
//! declared adjacency. [`LayerCollection`](crate::LayerCollection) does not
//! use it; it serves callers that place layers from independent components
//! and only know when each one mounted.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEntry {
    pub id: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default)]
pub struct LayerOrderRegistry {
    entries: Vec<OrderEntry>,
}

impl LayerOrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` at `timestamp` and re-sorts. Returns whether anything
    /// observable changed: always true for a new id, and for a known id only
    /// if its index moved.
    pub fn assert_position(&mut self, id: &str, timestamp: u64) -> bool {
        let previous = self.index_of(id);
        if let Some(index) = previous {
            self.entries.remove(index);
        }

        self.entries.push(OrderEntry {
            id: id.to_string(),
            timestamp,
        });
        // Stable, so equal timestamps keep insertion order.
        self.entries.sort_by_key(|entry| entry.timestamp);

        match previous {
            Some(index) => self.index_of(id) != Some(index),
            None => true,
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_sort_by_timestamp() {
        let mut registry = LayerOrderRegistry::new();
        assert!(registry.assert_position("b", 20));
        assert!(registry.assert_position("a", 10));
        assert!(registry.assert_position("c", 30));

        assert_eq!(registry.ids(), vec!["a", "b", "c"]);
        assert_eq!(registry.index_of("c"), Some(2));
    }

    #[test]
    fn test_unchanged_position_is_noop() {
        let mut registry = LayerOrderRegistry::new();
        registry.assert_position("a", 10);
        registry.assert_position("b", 20);

        assert!(!registry.assert_position("b", 25));
        assert_eq!(registry.ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_reassert_moves_layer() {
        let mut registry = LayerOrderRegistry::new();
        registry.assert_position("a", 10);
        registry.assert_position("b", 20);

        assert!(registry.assert_position("a", 30));
        assert_eq!(registry.ids(), vec!["b", "a"]);
    }

    #[test]
    fn test_equal_timestamps_are_stable() {
        let mut registry = LayerOrderRegistry::new();
        registry.assert_position("a", 10);
        registry.assert_position("b", 10);
        registry.assert_position("c", 10);

        assert_eq!(registry.ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_index_of_absent() {
        let mut registry = LayerOrderRegistry::new();
        assert_eq!(registry.index_of("a"), None);

        registry.assert_position("a", 1);
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert_eq!(registry.index_of("a"), None);
        assert!(registry.is_empty());
    }
}
