#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **chronik-store-memory** – In-memory storage driver for chronik.
//!
//! This crate provides fast, non-persistent recorders suitable for testing,
//! development, and scenarios where durability is not required. All data is
//! lost when the process terminates.
//!
//! Atomicity comes from holding the write lock for the whole insert call:
//! records are validated against the per-originator version constraint
//! first, so a conflicting call writes nothing at all.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use chronik_core::{
    EventRecorder, EventSelect, Notification, Result, Snapshot, SnapshotRecorder, StoreError,
    StoredEvent,
};

//─────────────────────────────
//  Shared range selection
//─────────────────────────────

fn select_range<T: Clone>(stream: &BTreeMap<u64, T>, select: &EventSelect) -> Vec<T> {
    let lower = match select.gt {
        Some(gt) => Bound::Excluded(gt),
        None => Bound::Unbounded,
    };
    let upper = match select.lte {
        Some(lte) => Bound::Included(lte),
        None => Bound::Unbounded,
    };
    let range = stream.range((lower, upper));
    let limit = select.limit.unwrap_or(usize::MAX);
    if select.desc {
        range.rev().take(limit).map(|(_, r)| r.clone()).collect()
    } else {
        range.take(limit).map(|(_, r)| r.clone()).collect()
    }
}

//─────────────────────────────
//  Event recorder
//─────────────────────────────

#[derive(Default)]
struct EventStoreState {
    streams: HashMap<Uuid, BTreeMap<u64, StoredEvent>>,
    notifications: BTreeMap<u64, Notification>,
    last_notification_id: u64,
}

/// An in-memory, non-persistent event recorder.
///
/// Events are held in per-originator version maps plus one global
/// notification map. Notification ids are assigned from a monotonic counter
/// under the same lock that guards the maps, so ids reflect commit order and
/// each insert call gets a contiguous run.
#[derive(Clone, Default)]
pub struct MemoryEventRecorder {
    inner: Arc<RwLock<EventStoreState>>,
}

impl MemoryEventRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events across all originators.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.notifications.len()
    }
}

#[async_trait]
impl EventRecorder for MemoryEventRecorder {
    async fn insert_events(&self, records: &[StoredEvent]) -> Result<Vec<u64>> {
        let mut state = self.inner.write().await;

        // Validate the whole batch before touching anything, so a conflict
        // aborts the call with the store unchanged.
        let mut incoming = HashSet::with_capacity(records.len());
        for record in records {
            let key = (record.originator_id, record.originator_version);
            let occupied = state
                .streams
                .get(&record.originator_id)
                .map(|stream| stream.contains_key(&record.originator_version))
                .unwrap_or(false);
            if occupied || !incoming.insert(key) {
                return Err(StoreError::RecordConflict(record.originator_id));
            }
        }

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            state.last_notification_id += 1;
            let id = state.last_notification_id;
            state
                .streams
                .entry(record.originator_id)
                .or_default()
                .insert(record.originator_version, record.clone());
            state.notifications.insert(
                id,
                Notification {
                    id,
                    originator_id: record.originator_id,
                    originator_version: record.originator_version,
                    topic: record.topic.clone(),
                    state: record.state.clone(),
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn select_events(
        &self,
        originator_id: Uuid,
        select: &EventSelect,
    ) -> Result<Vec<StoredEvent>> {
        let state = self.inner.read().await;
        Ok(state
            .streams
            .get(&originator_id)
            .map(|stream| select_range(stream, select))
            .unwrap_or_default())
    }

    async fn select_notifications(&self, start: u64, limit: usize) -> Result<Vec<Notification>> {
        let state = self.inner.read().await;
        Ok(state
            .notifications
            .range(start..)
            .take(limit)
            .map(|(_, n)| n.clone())
            .collect())
    }

    async fn max_notification_id(&self) -> Result<u64> {
        Ok(self.inner.read().await.last_notification_id)
    }
}

//─────────────────────────────
//  Snapshot recorder
//─────────────────────────────

/// An in-memory, non-persistent snapshot recorder.
#[derive(Clone, Default)]
pub struct MemorySnapshotRecorder {
    inner: Arc<RwLock<HashMap<Uuid, BTreeMap<u64, Snapshot>>>>,
}

impl MemorySnapshotRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotRecorder for MemorySnapshotRecorder {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let mut state = self.inner.write().await;
        let stream = state.entry(snapshot.originator_id).or_default();
        if stream.contains_key(&snapshot.originator_version) {
            return Err(StoreError::RecordConflict(snapshot.originator_id));
        }
        stream.insert(snapshot.originator_version, snapshot.clone());
        Ok(())
    }

    async fn select_snapshots(
        &self,
        originator_id: Uuid,
        select: &EventSelect,
    ) -> Result<Vec<Snapshot>> {
        let state = self.inner.read().await;
        Ok(state
            .get(&originator_id)
            .map(|stream| select_range(stream, select))
            .unwrap_or_default())
    }
}
