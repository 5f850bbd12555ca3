//! Registry of known event types.
//!
//! Topics are the stable string names records carry; the registry maps each
//! one to its current schema version. The mapper consults it when encoding
//! (to stamp the version written) and when decoding (to reject records whose
//! post-upcast topic nobody claims). Populate it at application construction;
//! it is read-only afterwards and shared without synchronization.

use std::collections::HashMap;

/// Maps topic strings to their current schema version.
#[derive(Clone, Debug, Default)]
pub struct EventTypeRegistry {
    topics: HashMap<String, u64>,
}

impl EventTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic at schema version 1.
    pub fn register(&mut self, topic: impl Into<String>) -> &mut Self {
        self.register_versioned(topic, 1)
    }

    /// Register a topic whose current schema version is `version`.
    ///
    /// Registering an already-known topic replaces its version; the last
    /// registration wins.
    pub fn register_versioned(&mut self, topic: impl Into<String>, version: u64) -> &mut Self {
        self.topics.insert(topic.into(), version);
        self
    }

    /// Whether records with this topic are addressable.
    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// The current schema version for a topic, if registered.
    pub fn schema_version(&self, topic: &str) -> Option<u64> {
        self.topics.get(topic).copied()
    }

    /// Number of registered topics.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether no topics are registered.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_defaults_to_version_one() {
        let mut registry = EventTypeRegistry::new();
        registry.register("world.created");
        assert!(registry.contains("world.created"));
        assert_eq!(registry.schema_version("world.created"), Some(1));
        assert_eq!(registry.schema_version("world.destroyed"), None);
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = EventTypeRegistry::new();
        registry
            .register_versioned("world.created", 1)
            .register_versioned("world.created", 3);
        assert_eq!(registry.schema_version("world.created"), Some(3));
        assert_eq!(registry.len(), 1);
    }
}
