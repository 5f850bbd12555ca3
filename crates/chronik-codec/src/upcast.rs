//! Schema evolution applied to records before decoding.
//!
//! Stored records carry an implicit schema version in their state under the
//! reserved `_version_` key, defaulting to 1. On read, the chain repeatedly
//! applies the upcaster registered for the record's current `(topic,
//! version)`, bumping the version after each step, until none applies.
//! Encoding of new events always writes the current version.

use std::sync::Arc;

use chronik_core::{Result, StateMap, Value};

/// Reserved state key carrying a record's schema version.
pub const SCHEMA_VERSION_KEY: &str = "_version_";

/// A pure transform from one record schema version to the next.
///
/// Upcasters must be total for the records they claim: refusing a claimed
/// record is an integrity failure surfaced to the reader.
pub trait Upcaster: Send + Sync {
    /// Topic this upcaster claims.
    fn topic(&self) -> &str;

    /// Schema version this upcaster consumes.
    fn from_version(&self) -> u64;

    /// Migrate the state, optionally renaming the topic.
    fn upcast(&self, topic: &str, state: StateMap) -> Result<(String, StateMap)>;
}

/// Ordered collection of upcasters applied until quiescence.
#[derive(Clone, Default)]
pub struct UpcasterChain {
    upcasters: Vec<Arc<dyn Upcaster>>,
}

impl UpcasterChain {
    /// An empty chain; every record passes through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an upcaster. Within one `(topic, version)` pair the earliest
    /// registration wins each round.
    pub fn push(&mut self, upcaster: impl Upcaster + 'static) -> &mut Self {
        self.upcasters.push(Arc::new(upcaster));
        self
    }

    /// Number of registered upcasters.
    pub fn len(&self) -> usize {
        self.upcasters.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.upcasters.is_empty()
    }

    /// Run the chain over a record's topic and state.
    pub fn apply(&self, topic: String, state: StateMap) -> Result<(String, StateMap)> {
        let (mut topic, mut state) = (topic, state);
        loop {
            let version = state
                .get(SCHEMA_VERSION_KEY)
                .and_then(Value::as_u64)
                .unwrap_or(1);
            let Some(upcaster) = self
                .upcasters
                .iter()
                .find(|u| u.topic() == topic && u.from_version() == version)
            else {
                break;
            };
            let (next_topic, next_state) = upcaster.upcast(&topic, state)?;
            topic = next_topic;
            state = next_state;
            state.insert(SCHEMA_VERSION_KEY.to_owned(), Value::from(version + 1));
        }
        Ok((topic, state))
    }
}
