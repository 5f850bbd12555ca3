//! Domain events and the records they are stored as.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::StateMap;

//─────────────────────────────
//  Domain events
//─────────────────────────────

/// An immutable fact about a past change to an aggregate.
///
/// The `topic` names the event type for decoding and reducer dispatch; the
/// `state` carries the event's payload as a value mapping. Versions are
/// assigned by the originating aggregate and form a contiguous sequence
/// starting at 1 for each originator.
#[derive(Clone, Debug, PartialEq)]
pub struct DomainEvent {
    /// The aggregate that produced this event.
    pub originator_id: Uuid,
    /// Position of this event in its originator's stream, starting at 1.
    pub originator_version: u64,
    /// Wall-clock time the event was created.
    pub timestamp: DateTime<Utc>,
    /// Stable name of the event type, e.g. `world.something_happened`.
    pub topic: String,
    /// Event payload.
    pub state: StateMap,
}

impl DomainEvent {
    /// Create an event stamped with the current wall-clock time.
    ///
    /// Timestamps are truncated to microseconds, the precision the wire
    /// form preserves.
    pub fn new(
        originator_id: Uuid,
        originator_version: u64,
        topic: impl Into<String>,
        state: StateMap,
    ) -> Self {
        use chrono::Timelike;
        let now = Utc::now();
        let timestamp = now
            .with_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now);
        Self {
            originator_id,
            originator_version,
            timestamp,
            topic: topic.into(),
            state,
        }
    }
}

//─────────────────────────────
//  Stored records
//─────────────────────────────

/// The wire form of a domain event.
///
/// `state` holds the encoded payload after the full codec pipeline:
/// transcoded, optionally compressed, optionally encrypted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// The aggregate that produced this event.
    pub originator_id: Uuid,
    /// Position of this event in its originator's stream.
    pub originator_version: u64,
    /// Stable name of the event type.
    pub topic: String,
    /// Encoded payload bytes.
    pub state: Vec<u8>,
}

/// A stored event enriched with its globally unique, strictly increasing
/// notification id.
///
/// Ids are assigned at insert and reflect commit order. They are monotonic
/// but not necessarily contiguous: aborted transactions may leave gaps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Global position in the event store.
    pub id: u64,
    /// The aggregate that produced the underlying event.
    pub originator_id: Uuid,
    /// Position of the event in its originator's stream.
    pub originator_version: u64,
    /// Stable name of the event type.
    pub topic: String,
    /// Encoded payload bytes.
    pub state: Vec<u8>,
}

/// A captured aggregate state at a given version.
///
/// Structurally a stored event, but snapshots live in their own store and
/// never receive a notification id.
pub type Snapshot = StoredEvent;

/// A bounded window of the notification stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    /// `"first,last"` of the returned items, or `None` when empty.
    pub section_id: Option<String>,
    /// The notifications in this window, ascending by id.
    pub items: Vec<Notification>,
    /// Section id to request next, or `None` at the end of the stream.
    pub next_id: Option<String>,
}

//─────────────────────────────
//  Range selection
//─────────────────────────────

/// Version-range selection for event and snapshot reads.
///
/// `gt`/`lte` bound the originator version exclusively below and inclusively
/// above; `desc` reverses the order; `limit` caps the row count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSelect {
    /// Only versions strictly greater than this.
    pub gt: Option<u64>,
    /// Only versions less than or equal to this.
    pub lte: Option<u64>,
    /// Return rows in descending version order.
    pub desc: bool,
    /// At most this many rows.
    pub limit: Option<usize>,
}

impl EventSelect {
    /// Select everything, ascending.
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep versions strictly greater than `version`.
    pub fn after(mut self, version: u64) -> Self {
        self.gt = Some(version);
        self
    }

    /// Keep versions less than or equal to `version`.
    pub fn until(mut self, version: u64) -> Self {
        self.lte = Some(version);
        self
    }

    /// Return rows newest-first.
    pub fn descending(mut self) -> Self {
        self.desc = true;
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}
