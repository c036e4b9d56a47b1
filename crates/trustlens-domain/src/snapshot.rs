//! Snapshots: the durable record of a cycle's result for an entity

use crate::{CompositeScore, CycleId, EntityId};
use serde::{Deserialize, Serialize};

/// Schema version written into every persisted snapshot
pub const SCHEMA_VERSION: u32 = 1;

/// Immutable result of one cycle for one entity
///
/// The append-only snapshot log is the system of record; events are only
/// notifications about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Entity scored
    pub entity_id: EntityId,
    /// Cycle that produced it
    pub cycle_id: CycleId,
    /// The score itself
    pub composite_score: CompositeScore,
    /// Persisted schema version
    pub schema_version: u32,
    /// When the snapshot was committed (ms since epoch)
    pub stored_at: u64,
}

impl Snapshot {
    /// Wrap a composite score for storage at the current schema version
    pub fn new(composite_score: CompositeScore, stored_at: u64) -> Self {
        Self {
            entity_id: composite_score.entity_id.clone(),
            cycle_id: composite_score.cycle_id,
            composite_score,
            schema_version: SCHEMA_VERSION,
            stored_at,
        }
    }
}
