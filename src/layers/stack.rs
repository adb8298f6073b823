//! Ordered layer records, bottom to top, addressed by identity.
//!
//! The collection keeps one of these mirroring the layers it has placed in
//! the engine, so it can tell whether a layer still sits directly below its
//! declared neighbour. The headless engine uses the same structure as its
//! actual render stack.

/// A layer stack. Index 0 is drawn first (bottom).
#[derive(Debug, Clone)]
pub struct LayerStack<T = ()> {
    records: Vec<(String, T)>,
}

impl<T> Default for LayerStack<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T> LayerStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a record on top. Returns false, leaving the stack untouched, if
    /// the id is already present.
    pub fn push(&mut self, id: impl Into<String>, record: T) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.records.push((id, record));
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.index_of(id)?;
        Some(self.records.remove(index).1)
    }

    /// Moves `id` so it sits immediately below `before_id`. Returns false if
    /// either layer is missing.
    pub fn move_before(&mut self, id: &str, before_id: &str) -> bool {
        if id == before_id || !self.contains(before_id) {
            return false;
        }
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let record = self.records.remove(from);
        // Looked up after removal since the target may have shifted down.
        let Some(to) = self.index_of(before_id) else {
            self.records.insert(from, record);
            return false;
        };
        self.records.insert(to, record);
        true
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|(record_id, _)| record_id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Whether `id` is directly below `before_id`.
    pub fn is_directly_below(&self, id: &str, before_id: &str) -> bool {
        match (self.index_of(id), self.index_of(before_id)) {
            (Some(below), Some(above)) => below + 1 == above,
            _ => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records
            .iter()
            .find(|(record_id, _)| record_id == id)
            .map(|(_, record)| record)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.records
            .iter_mut()
            .find(|(record_id, _)| record_id == id)
            .map(|(_, record)| record)
    }

    /// Identities bottom to top.
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(ids: &[&str]) -> LayerStack {
        let mut stack = LayerStack::new();
        for id in ids {
            stack.push(*id, ());
        }
        stack
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut stack = stack(&["1", "2"]);
        assert!(!stack.push("1", ()));
        assert_eq!(stack.ids(), vec!["1", "2"]);
    }

    #[test]
    fn test_move_before_down_and_up() {
        let mut stack = stack(&["1", "2", "3"]);

        assert!(stack.move_before("3", "1"));
        assert_eq!(stack.ids(), vec!["3", "1", "2"]);

        assert!(stack.move_before("3", "2"));
        assert_eq!(stack.ids(), vec!["1", "3", "2"]);
    }

    #[test]
    fn test_move_before_missing_layer() {
        let mut stack = stack(&["1", "2"]);
        assert!(!stack.move_before("1", "9"));
        assert!(!stack.move_before("9", "1"));
        assert!(!stack.move_before("1", "1"));
        assert_eq!(stack.ids(), vec!["1", "2"]);
    }

    #[test]
    fn test_is_directly_below() {
        let stack = stack(&["1", "2", "3"]);
        assert!(stack.is_directly_below("1", "2"));
        assert!(!stack.is_directly_below("1", "3"));
        assert!(!stack.is_directly_below("3", "2"));
        assert!(!stack.is_directly_below("1", "9"));
    }

    #[test]
    fn test_remove() {
        let mut stack = stack(&["1", "2", "3"]);
        assert!(stack.remove("2").is_some());
        assert!(stack.remove("2").is_none());
        assert!(stack.is_directly_below("1", "3"));
    }
}
