//! Detached content containers.
//!
//! Marker and popup content is rendered into a [`RenderTarget`] that lives
//! outside the map; the engine is told to adopt the target at a geographic
//! anchor and shows whatever was last rendered into it.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RenderTarget {
    id: String,
    content: Arc<Mutex<String>>,
}

impl RenderTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Arc::new(Mutex::new(String::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replaces the rendered content. Every clone of the target sees it.
    pub fn render(&self, content: impl Into<String>) {
        let mut current = self
            .content
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = content.into();
    }

    pub fn content(&self) -> String {
        self.content
            .lock()
            .map(|content| content.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.render(String::new());
    }
}

impl PartialEq for RenderTarget {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_content() {
        let target = RenderTarget::new("marker-1");
        let adopted = target.clone();

        target.render("<b>Bar Harbor</b>");
        assert_eq!(adopted.content(), "<b>Bar Harbor</b>");

        target.clear();
        assert!(adopted.content().is_empty());
        assert_eq!(adopted.id(), "marker-1");
    }
}
