//! Facades over mapper + recorder.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use chronik_codec::Mapper;
use chronik_core::{
    Aggregate, DomainEvent, EventRecorder, EventSelect, Result, Snapshot, SnapshotRecorder,
    StoreError,
};

/// The public face of event persistence.
///
/// `put` maps domain events to stored records and appends them in one
/// recorder call, so atomicity spans everything handed to a single `put` -
/// including events from different aggregates. `get` reads records back and
/// decodes them lazily.
pub struct EventStore {
    mapper: Arc<Mapper>,
    recorder: Arc<dyn EventRecorder>,
}

impl EventStore {
    /// Build a store from a mapper and a recorder.
    pub fn new(mapper: Arc<Mapper>, recorder: Arc<dyn EventRecorder>) -> Self {
        Self { mapper, recorder }
    }

    /// Append all events atomically; returns their notification ids in
    /// input order.
    pub async fn put(&self, events: &[DomainEvent]) -> Result<Vec<u64>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let records = events
            .iter()
            .map(|event| self.mapper.to_stored_event(event))
            .collect::<Result<Vec<_>>>()?;
        let ids = self.recorder.insert_events(&records).await?;
        debug!(count = events.len(), "events appended");
        Ok(ids)
    }

    /// Read an originator's events in the selected version range.
    ///
    /// Records are fetched up front; upcasting and decoding happen as the
    /// returned iterator is driven. The iterator is finite and not
    /// restartable.
    pub async fn get(
        &self,
        originator_id: Uuid,
        select: &EventSelect,
    ) -> Result<impl Iterator<Item = Result<DomainEvent>>> {
        let records = self.recorder.select_events(originator_id, select).await?;
        let mapper = self.mapper.clone();
        Ok(records
            .into_iter()
            .map(move |record| mapper.to_domain_event(&record)))
    }

    /// The recorder behind this store.
    pub fn recorder(&self) -> &Arc<dyn EventRecorder> {
        &self.recorder
    }
}

/// The public face of snapshot persistence.
pub struct SnapshotStore {
    mapper: Arc<Mapper>,
    recorder: Arc<dyn SnapshotRecorder>,
}

impl SnapshotStore {
    /// Build a store from a mapper and a recorder.
    pub fn new(mapper: Arc<Mapper>, recorder: Arc<dyn SnapshotRecorder>) -> Self {
        Self { mapper, recorder }
    }

    /// Capture an aggregate's current state, keyed by its id and version.
    ///
    /// A key collision surfaces as [`StoreError::RecordConflict`]; the
    /// colliding record captures the same state, so callers may ignore it.
    pub async fn put<A: Aggregate>(&self, aggregate: &A) -> Result<()> {
        let snapshot = Snapshot {
            originator_id: aggregate.id(),
            originator_version: aggregate.version(),
            topic: A::TOPIC.to_owned(),
            state: self
                .mapper
                .encode_snapshot_state(A::TOPIC, &aggregate.snapshot_state())?,
        };
        self.recorder.insert_snapshot(&snapshot).await
    }

    /// Rebuild an aggregate from the highest snapshot with
    /// `version <= lte`, or the latest snapshot when unbounded.
    pub async fn get<A: Aggregate>(&self, originator_id: Uuid, lte: Option<u64>) -> Result<Option<A>> {
        let mut select = EventSelect::all().descending().limit(1);
        if let Some(lte) = lte {
            select = select.until(lte);
        }
        let Some(snapshot) = self
            .recorder
            .select_snapshots(originator_id, &select)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        let (topic, state) = self
            .mapper
            .decode_state(snapshot.topic.clone(), &snapshot.state)?;
        if topic != A::TOPIC {
            return Err(StoreError::Integrity(format!(
                "snapshot for {originator_id} has topic `{topic}`, expected `{}`",
                A::TOPIC
            )));
        }
        A::from_snapshot(snapshot.originator_id, snapshot.originator_version, state).map(Some)
    }
}
