//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and
//! infrastructure. Implementations live in other crates.

use crate::{CycleId, CycleRecord, EntityId, Snapshot};

/// Append-only store of snapshots with a per-entity "latest" pointer
///
/// Implemented by the infrastructure layer (trustlens-store)
pub trait SnapshotStore {
    /// Error type for store operations
    type Error;

    /// Append a snapshot and advance the entity's latest pointer
    ///
    /// Both happen atomically: a reader sees either the previous state or
    /// the new snapshot as latest, never a partial write.
    fn commit(&mut self, snapshot: &Snapshot) -> Result<(), Self::Error>;

    /// Most recent committed snapshot for an entity
    fn latest(&self, entity_id: &EntityId) -> Result<Option<Snapshot>, Self::Error>;

    /// Exact historical snapshot for (entity, cycle)
    fn at_cycle(&self, entity_id: &EntityId, cycle_id: CycleId)
        -> Result<Option<Snapshot>, Self::Error>;

    /// Committed snapshots for an entity, newest first
    fn history(&self, entity_id: &EntityId, limit: usize) -> Result<Vec<Snapshot>, Self::Error>;

    /// The latest snapshot of every entity (used for rehydration)
    fn latest_all(&self) -> Result<Vec<Snapshot>, Self::Error>;

    /// Record what happened to an entity in a cycle
    fn record_cycle(&mut self, record: &CycleRecord) -> Result<(), Self::Error>;

    /// All records written for a cycle
    fn cycle_records(&self, cycle_id: CycleId) -> Result<Vec<CycleRecord>, Self::Error>;
}
