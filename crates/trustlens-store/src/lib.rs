//! TrustLens Storage Layer
//!
//! Implements the [`SnapshotStore`] trait on SQLite.
//!
//! # Architecture
//!
//! - `snapshots`: append-only log of scoring results, one row per
//!   (entity, cycle), body stored as JSON
//! - `latest`: per-entity pointer, advanced in the same transaction as the
//!   snapshot insert so readers never see a half-written commit
//! - `cycle_log`: per-entity outcome of every cycle
//!
//! # Examples
//!
//! ```no_run
//! use trustlens_store::SqliteSnapshotStore;
//!
//! let store = SqliteSnapshotStore::new("trustlens.db").unwrap();
//! // Store is now ready for snapshot operations
//! ```

#![warn(missing_docs)]

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use trustlens_domain::traits::SnapshotStore;
use trustlens_domain::{CycleId, CycleRecord, EntityId, Snapshot, SCHEMA_VERSION};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored row could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A snapshot for this (entity, cycle) already exists
    #[error("Snapshot already committed for {entity_id} in cycle {cycle_id}")]
    Duplicate {
        /// Entity of the rejected snapshot
        entity_id: EntityId,
        /// Cycle of the rejected snapshot
        cycle_id: CycleId,
    },

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot written by a newer version of the schema
    #[error("Unsupported snapshot schema version {found} (supported up to {supported})")]
    UnsupportedSchema {
        /// Version found on disk
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },
}

/// SQLite-based implementation of [`SnapshotStore`]
///
/// # Thread Safety
///
/// SQLite connections are not `Sync`. Share a store across tasks behind a
/// mutex (the rollup does this).
pub struct SqliteSnapshotStore {
    conn: Connection,
}

impl SqliteSnapshotStore {
    /// Open (or create) a store at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open a fresh in-memory store
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Number of snapshots in the log
    pub fn snapshot_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Convert CycleId to bytes for storage
    fn cycle_id_to_bytes(id: CycleId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to CycleId
    fn bytes_to_cycle_id(bytes: &[u8]) -> Result<CycleId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!(
                "Expected 16 bytes for CycleId, got {}",
                bytes.len()
            ))
        })?;
        Ok(CycleId::from_value(u128::from_be_bytes(arr)))
    }

    /// Decode a snapshot row, refusing versions newer than this build
    fn decode_snapshot(schema_version: u32, body: &str) -> Result<Snapshot, StoreError> {
        if schema_version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(serde_json::from_str(body)?)
    }

    fn query_snapshots(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Snapshot>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (version, body) = row?;
            snapshots.push(Self::decode_snapshot(version, &body)?);
        }
        Ok(snapshots)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    type Error = StoreError;

    fn commit(&mut self, snapshot: &Snapshot) -> Result<(), Self::Error> {
        let cycle_bytes = Self::cycle_id_to_bytes(snapshot.cycle_id);
        let entity = snapshot.entity_id.as_str();
        let body = serde_json::to_string(snapshot)?;

        let tx = self.conn.transaction()?;

        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM snapshots WHERE entity_id = ?1 AND cycle_id = ?2",
                params![entity, &cycle_bytes],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        if exists {
            return Err(StoreError::Duplicate {
                entity_id: snapshot.entity_id.clone(),
                cycle_id: snapshot.cycle_id,
            });
        }

        tx.execute(
            "INSERT INTO snapshots (entity_id, cycle_id, schema_version, overall, confidence, stored_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entity,
                &cycle_bytes,
                snapshot.schema_version,
                snapshot.composite_score.overall,
                snapshot.composite_score.confidence,
                snapshot.stored_at as i64,
                &body,
            ],
        )?;

        // The pointer only ever moves forward in cycle order
        tx.execute(
            "INSERT INTO latest (entity_id, cycle_id) VALUES (?1, ?2)
             ON CONFLICT(entity_id) DO UPDATE SET cycle_id = excluded.cycle_id
             WHERE excluded.cycle_id > latest.cycle_id",
            params![entity, &cycle_bytes],
        )?;

        tx.commit()?;

        debug!(
            "Committed snapshot for {} at cycle {} (overall {:.2})",
            snapshot.entity_id, snapshot.cycle_id, snapshot.composite_score.overall
        );
        Ok(())
    }

    fn latest(&self, entity_id: &EntityId) -> Result<Option<Snapshot>, Self::Error> {
        let row = self
            .conn
            .query_row(
                "SELECT s.schema_version, s.body
                 FROM latest l
                 JOIN snapshots s ON s.entity_id = l.entity_id AND s.cycle_id = l.cycle_id
                 WHERE l.entity_id = ?1",
                params![entity_id.as_str()],
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(version, body)| Self::decode_snapshot(version, &body))
            .transpose()
    }

    fn at_cycle(
        &self,
        entity_id: &EntityId,
        cycle_id: CycleId,
    ) -> Result<Option<Snapshot>, Self::Error> {
        let row = self
            .conn
            .query_row(
                "SELECT schema_version, body FROM snapshots WHERE entity_id = ?1 AND cycle_id = ?2",
                params![entity_id.as_str(), Self::cycle_id_to_bytes(cycle_id)],
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(version, body)| Self::decode_snapshot(version, &body))
            .transpose()
    }

    fn history(&self, entity_id: &EntityId, limit: usize) -> Result<Vec<Snapshot>, Self::Error> {
        self.query_snapshots(
            "SELECT schema_version, body FROM snapshots
             WHERE entity_id = ?1
             ORDER BY cycle_id DESC
             LIMIT ?2",
            params![entity_id.as_str(), limit as i64],
        )
    }

    fn latest_all(&self) -> Result<Vec<Snapshot>, Self::Error> {
        self.query_snapshots(
            "SELECT s.schema_version, s.body
             FROM latest l
             JOIN snapshots s ON s.entity_id = l.entity_id AND s.cycle_id = l.cycle_id
             ORDER BY l.entity_id",
            params![],
        )
    }

    fn record_cycle(&mut self, record: &CycleRecord) -> Result<(), Self::Error> {
        let body = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO cycle_log (cycle_id, entity_id, trigger_kind, outcome, recorded_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Self::cycle_id_to_bytes(record.cycle_id),
                record.entity_id.as_str(),
                record.trigger.as_str(),
                record.outcome.as_str(),
                record.recorded_at as i64,
                &body,
            ],
        )?;
        Ok(())
    }

    fn cycle_records(&self, cycle_id: CycleId) -> Result<Vec<CycleRecord>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT cycle_id, body FROM cycle_log WHERE cycle_id = ?1 ORDER BY entity_id",
        )?;
        let rows = stmt.query_map(params![Self::cycle_id_to_bytes(cycle_id)], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (bytes, body) = row?;
            let record: CycleRecord = serde_json::from_str(&body)?;
            if record.cycle_id != Self::bytes_to_cycle_id(&bytes)? {
                return Err(StoreError::InvalidData(format!(
                    "cycle_log row for {} does not match its key",
                    record.entity_id
                )));
            }
            records.push(record);
        }
        Ok(records)
    }
}
