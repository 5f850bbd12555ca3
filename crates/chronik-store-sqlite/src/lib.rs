#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **chronik-store-sqlite** – SQLite storage driver for chronik.
//!
//! Durable recorders backed by SQLite via sqlx. Notification ids come from
//! an `AUTOINCREMENT` rowid, so they are strictly increasing across the
//! store and contiguous within one insert transaction; the per-originator
//! version constraint is a `UNIQUE` index whose violation maps to the
//! retriable conflict error. SQLite's single-writer transaction lock
//! serializes concurrent insert calls, so a reader never observes a later
//! id while an earlier one is still uncommitted.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use chronik_core::{
    EventRecorder, EventSelect, Notification, Result, Snapshot, SnapshotRecorder, StoreError,
    StoredEvent,
};

fn persistence(e: sqlx::Error) -> StoreError {
    StoreError::Persistence(e.to_string())
}

fn map_insert_error(e: sqlx::Error, originator_id: Uuid) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.kind() == sqlx::error::ErrorKind::UniqueViolation {
            return StoreError::RecordConflict(originator_id);
        }
    }
    persistence(e)
}

/// Open or create a SQLite pool at `path` with the driver's connection
/// settings (WAL journal, busy timeout). Both recorders can share it.
pub async fn open_pool<P: AsRef<Path>>(path: P) -> Result<SqlitePool> {
    connect(path.as_ref()).await
}

async fn connect(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .map_err(persistence)
}

async fn connect_in_memory() -> Result<SqlitePool> {
    // One connection, or every pool checkout would see a fresh database.
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(persistence)
}

//─────────────────────────────
//  Event recorder
//─────────────────────────────

/// A durable event recorder backed by SQLite.
#[derive(Clone, Debug)]
pub struct SqliteEventRecorder {
    pool: SqlitePool,
}

impl SqliteEventRecorder {
    /// Open or create a database at `path` and ensure the schema exists.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let recorder = Self::from_pool(connect(path.as_ref()).await?);
        recorder.migrate().await?;
        Ok(recorder)
    }

    /// Open an in-memory database, for tests and temporary stores.
    pub async fn in_memory() -> Result<Self> {
        let recorder = Self::from_pool(connect_in_memory().await?);
        recorder.migrate().await?;
        Ok(recorder)
    }

    /// Wrap an existing pool without touching the schema.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool, for sharing with a snapshot recorder.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the event table if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stored_events (
                notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
                originator_id BLOB NOT NULL,
                originator_version INTEGER NOT NULL,
                topic TEXT NOT NULL,
                state BLOB NOT NULL,
                UNIQUE (originator_id, originator_version)
            ) STRICT
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        debug!("event schema ready");
        Ok(())
    }
}

#[async_trait]
impl EventRecorder for SqliteEventRecorder {
    async fn insert_events(&self, records: &[StoredEvent]) -> Result<Vec<u64>> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let done = sqlx::query(
                r#"
                INSERT INTO stored_events (originator_id, originator_version, topic, state)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(record.originator_id)
            .bind(record.originator_version as i64)
            .bind(&record.topic)
            .bind(&record.state)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, record.originator_id))?;
            ids.push(done.last_insert_rowid() as u64);
        }
        tx.commit().await.map_err(persistence)?;
        Ok(ids)
    }

    async fn select_events(
        &self,
        originator_id: Uuid,
        select: &EventSelect,
    ) -> Result<Vec<StoredEvent>> {
        let mut sql = String::from(
            "SELECT originator_version, topic, state FROM stored_events WHERE originator_id = ?",
        );
        if select.gt.is_some() {
            sql.push_str(" AND originator_version > ?");
        }
        if select.lte.is_some() {
            sql.push_str(" AND originator_version <= ?");
        }
        sql.push_str(if select.desc {
            " ORDER BY originator_version DESC"
        } else {
            " ORDER BY originator_version ASC"
        });
        if select.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(originator_id);
        if let Some(gt) = select.gt {
            query = query.bind(gt as i64);
        }
        if let Some(lte) = select.lte {
            query = query.bind(lte as i64);
        }
        if let Some(limit) = select.limit {
            query = query.bind(limit as i64);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(persistence)?;
        Ok(rows
            .into_iter()
            .map(|row| StoredEvent {
                originator_id,
                originator_version: row.get::<i64, _>("originator_version") as u64,
                topic: row.get("topic"),
                state: row.get("state"),
            })
            .collect())
    }

    async fn select_notifications(&self, start: u64, limit: usize) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT notification_id, originator_id, originator_version, topic, state
            FROM stored_events
            WHERE notification_id >= ?
            ORDER BY notification_id ASC
            LIMIT ?
            "#,
        )
        .bind(start as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows
            .into_iter()
            .map(|row| Notification {
                id: row.get::<i64, _>("notification_id") as u64,
                originator_id: row.get("originator_id"),
                originator_version: row.get::<i64, _>("originator_version") as u64,
                topic: row.get("topic"),
                state: row.get("state"),
            })
            .collect())
    }

    async fn max_notification_id(&self) -> Result<u64> {
        let max: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(notification_id), 0) FROM stored_events")
                .fetch_one(&self.pool)
                .await
                .map_err(persistence)?;
        Ok(max as u64)
    }
}

//─────────────────────────────
//  Snapshot recorder
//─────────────────────────────

/// A durable snapshot recorder backed by SQLite.
///
/// Usually shares the event recorder's pool; snapshots live in their own
/// table and never receive notification ids.
#[derive(Clone, Debug)]
pub struct SqliteSnapshotRecorder {
    pool: SqlitePool,
}

impl SqliteSnapshotRecorder {
    /// Wrap an existing pool without touching the schema.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the snapshot table if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                originator_id BLOB NOT NULL,
                originator_version INTEGER NOT NULL,
                topic TEXT NOT NULL,
                state BLOB NOT NULL,
                PRIMARY KEY (originator_id, originator_version)
            ) STRICT
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        debug!("snapshot schema ready");
        Ok(())
    }
}

#[async_trait]
impl SnapshotRecorder for SqliteSnapshotRecorder {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (originator_id, originator_version, topic, state)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.originator_id)
        .bind(snapshot.originator_version as i64)
        .bind(&snapshot.topic)
        .bind(&snapshot.state)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, snapshot.originator_id))?;
        Ok(())
    }

    async fn select_snapshots(
        &self,
        originator_id: Uuid,
        select: &EventSelect,
    ) -> Result<Vec<Snapshot>> {
        let mut sql = String::from(
            "SELECT originator_version, topic, state FROM snapshots WHERE originator_id = ?",
        );
        if select.gt.is_some() {
            sql.push_str(" AND originator_version > ?");
        }
        if select.lte.is_some() {
            sql.push_str(" AND originator_version <= ?");
        }
        sql.push_str(if select.desc {
            " ORDER BY originator_version DESC"
        } else {
            " ORDER BY originator_version ASC"
        });
        if select.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(originator_id);
        if let Some(gt) = select.gt {
            query = query.bind(gt as i64);
        }
        if let Some(lte) = select.lte {
            query = query.bind(lte as i64);
        }
        if let Some(limit) = select.limit {
            query = query.bind(limit as i64);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(persistence)?;
        Ok(rows
            .into_iter()
            .map(|row| Snapshot {
                originator_id,
                originator_version: row.get::<i64, _>("originator_version") as u64,
                topic: row.get("topic"),
                state: row.get("state"),
            })
            .collect())
    }
}
