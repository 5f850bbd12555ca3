//! Application wiring.
//!
//! An [`Application`] assembles the whole engine from [`Settings`]: it
//! constructs the configured recorders, composes the codec pipeline, and
//! hands out typed repositories over the shared stores. All handles are
//! established here and read-only afterwards, so one application instance
//! can serve many tasks.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use chronik_codec::{
    Aes256GcmCipher, JsonTranscoder, Mapper, Transcoding, Upcaster, UpcasterChain, ZlibCompressor,
};
use chronik_core::{Aggregate, DomainEvent, EventRecorder, EventTypeRegistry, Result, SnapshotRecorder};
use chronik_store_memory::{MemoryEventRecorder, MemorySnapshotRecorder};
use chronik_store_sqlite::{open_pool, SqliteEventRecorder, SqliteSnapshotRecorder};

use crate::config::{Settings, StorageConfig};
use crate::notification_log::NotificationLog;
use crate::repository::Repository;
use crate::store::{EventStore, SnapshotStore};

/// Builds an [`Application`] from settings plus the domain's registrations.
pub struct ApplicationBuilder {
    settings: Settings,
    registry: EventTypeRegistry,
    transcoder: JsonTranscoder,
    upcasters: UpcasterChain,
}

impl ApplicationBuilder {
    /// Start a builder over the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            registry: EventTypeRegistry::new(),
            transcoder: JsonTranscoder::new(),
            upcasters: UpcasterChain::new(),
        }
    }

    /// Register an event or aggregate topic at schema version 1.
    pub fn register_topic(mut self, topic: impl Into<String>) -> Self {
        self.registry.register(topic);
        self
    }

    /// Register a topic whose current schema version is `version`.
    pub fn register_topic_versioned(mut self, topic: impl Into<String>, version: u64) -> Self {
        self.registry.register_versioned(topic, version);
        self
    }

    /// Register a transcoding for a custom value type.
    pub fn register_transcoding(mut self, transcoding: impl Transcoding + 'static) -> Self {
        self.transcoder.register(transcoding);
        self
    }

    /// Append an upcaster to the chain run before decoding.
    pub fn push_upcaster(mut self, upcaster: impl Upcaster + 'static) -> Self {
        self.upcasters.push(upcaster);
        self
    }

    /// Construct the recorders, compose the pipeline, and wire the stores.
    pub async fn build(self) -> Result<Application> {
        let (event_recorder, snapshot_recorder): (
            Arc<dyn EventRecorder>,
            Option<Arc<dyn SnapshotRecorder>>,
        ) = match &self.settings.storage {
            StorageConfig::Memory => {
                debug!("using in-memory recorders");
                let snapshots = self
                    .settings
                    .snapshotting_enabled
                    .then(|| Arc::new(MemorySnapshotRecorder::new()) as Arc<dyn SnapshotRecorder>);
                (Arc::new(MemoryEventRecorder::new()), snapshots)
            }
            StorageConfig::Sqlite { path, create_table } => {
                debug!(path = %path.display(), "using sqlite recorders");
                let pool = open_pool(path).await?;
                let events = SqliteEventRecorder::from_pool(pool.clone());
                if *create_table {
                    events.migrate().await?;
                }
                let snapshots = if self.settings.snapshotting_enabled {
                    let snapshots = SqliteSnapshotRecorder::from_pool(pool);
                    if *create_table {
                        snapshots.migrate().await?;
                    }
                    Some(Arc::new(snapshots) as Arc<dyn SnapshotRecorder>)
                } else {
                    None
                };
                (Arc::new(events), snapshots)
            }
        };

        let mut mapper = Mapper::new(Arc::new(self.transcoder), Arc::new(self.registry))
            .with_upcasters(Arc::new(self.upcasters));
        if self.settings.compression_enabled {
            mapper = mapper.with_compressor(Arc::new(ZlibCompressor::new()));
        }
        if let Some(cipher) = &self.settings.cipher {
            mapper = mapper.with_cipher(Arc::new(Aes256GcmCipher::from_base64(&cipher.key)?));
        }
        let mapper = Arc::new(mapper);

        let events = Arc::new(EventStore::new(mapper.clone(), event_recorder.clone()));
        let snapshots =
            snapshot_recorder.map(|recorder| Arc::new(SnapshotStore::new(mapper.clone(), recorder)));
        let log =
            NotificationLog::with_section_size(event_recorder, self.settings.section_size);

        info!(
            snapshotting = self.settings.snapshotting_enabled,
            compression = self.settings.compression_enabled,
            encrypted = self.settings.cipher.is_some(),
            "application ready"
        );

        Ok(Application {
            events,
            snapshots,
            log,
        })
    }
}

/// A fully wired engine instance.
pub struct Application {
    events: Arc<EventStore>,
    snapshots: Option<Arc<SnapshotStore>>,
    log: NotificationLog,
}

impl Application {
    /// Start building an application over the given settings.
    pub fn builder(settings: Settings) -> ApplicationBuilder {
        ApplicationBuilder::new(settings)
    }

    /// A typed repository over this application's stores.
    pub fn repository<A: Aggregate>(&self) -> Repository<A> {
        Repository::new(self.events.clone(), self.snapshots.clone())
    }

    /// Save one aggregate's pending events atomically.
    pub async fn save<A: Aggregate>(&self, aggregate: &mut A) -> Result<Vec<u64>> {
        let pending = aggregate.collect_pending_events();
        self.events.put(&pending).await
    }

    /// Save events drained from any number of aggregates in one atomic
    /// call; either every event commits or none does.
    pub async fn save_events(&self, events: &[DomainEvent]) -> Result<Vec<u64>> {
        self.events.put(events).await
    }

    /// Capture a snapshot of an aggregate at `version` (or its head).
    pub async fn take_snapshot<A: Aggregate>(
        &self,
        aggregate_id: Uuid,
        version: Option<u64>,
    ) -> Result<u64> {
        self.repository::<A>()
            .take_snapshot(aggregate_id, version)
            .await
    }

    /// The event store facade.
    pub fn event_store(&self) -> &Arc<EventStore> {
        &self.events
    }

    /// The snapshot store, when snapshotting is enabled.
    pub fn snapshot_store(&self) -> Option<&Arc<SnapshotStore>> {
        self.snapshots.as_ref()
    }

    /// The notification log over this application's event stream.
    pub fn notification_log(&self) -> &NotificationLog {
        &self.log
    }
}
