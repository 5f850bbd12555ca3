//! Recorder traits implemented by storage drivers.
//!
//! A recorder is the only component that touches the backing store; calls
//! across this boundary are the engine's only suspension points. Handles are
//! established at construction, immutable afterwards, and shared freely
//! across tasks.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::event::{EventSelect, Notification, Snapshot, StoredEvent};

/// Abstraction over the append-only event record store.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    /// Atomically insert all records, returning their notification ids in
    /// input order.
    ///
    /// Ids are contiguous within one call, though not necessarily adjacent
    /// to ids returned by earlier calls. If any record would violate the
    /// per-originator version constraint the whole call aborts with
    /// [`StoreError::RecordConflict`] and nothing is written.
    ///
    /// [`StoreError::RecordConflict`]: crate::StoreError::RecordConflict
    async fn insert_events(&self, records: &[StoredEvent]) -> Result<Vec<u64>>;

    /// Read an originator's records within the selected version range.
    async fn select_events(
        &self,
        originator_id: Uuid,
        select: &EventSelect,
    ) -> Result<Vec<StoredEvent>>;

    /// Read up to `limit` notifications with `id >= start`, ascending.
    ///
    /// The returned ids may have gaps, and a gap is permanent once a later
    /// id is visible: implementors must never surface an earlier id after
    /// a later one has been returned. How a caller derives its next window
    /// from the result is its own concern.
    async fn select_notifications(&self, start: u64, limit: usize) -> Result<Vec<Notification>>;

    /// The highest assigned notification id, or 0 when the store is empty.
    async fn max_notification_id(&self) -> Result<u64>;
}

/// Abstraction over the snapshot record store.
///
/// Snapshots are keyed by `(originator_id, originator_version)` and never
/// participate in notification ordering.
#[async_trait]
pub trait SnapshotRecorder: Send + Sync {
    /// Insert one snapshot record.
    ///
    /// A key collision aborts with [`StoreError::RecordConflict`]; since the
    /// colliding snapshot captures the same state, callers may treat that as
    /// benign.
    ///
    /// [`StoreError::RecordConflict`]: crate::StoreError::RecordConflict
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Read an originator's snapshots within the selected version range.
    async fn select_snapshots(
        &self,
        originator_id: Uuid,
        select: &EventSelect,
    ) -> Result<Vec<Snapshot>>;
}
