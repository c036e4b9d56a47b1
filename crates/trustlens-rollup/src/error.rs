//! Error types for the rollup

use thiserror::Error;
use trustlens_domain::{CycleId, EntityId};

/// Errors from committing results
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RollupError {
    /// The snapshot write failed; fatal for this entity-cycle only
    #[error("Snapshot write failed for {entity_id} in cycle {cycle_id}: {reason}")]
    SnapshotWrite {
        /// Entity being committed
        entity_id: EntityId,
        /// Cycle being committed
        cycle_id: CycleId,
        /// Store error message
        reason: String,
    },

    /// A cycle older than the entity's latest was offered
    #[error("Cycle {attempted} for {entity_id} is older than committed cycle {latest}")]
    OutOfOrder {
        /// Entity being committed
        entity_id: EntityId,
        /// Cycle currently latest
        latest: CycleId,
        /// Cycle that was rejected
        attempted: CycleId,
    },

    /// Store unavailable (lock poisoned or read failure)
    #[error("Store error: {0}")]
    Store(String),
}

/// Errors from pull queries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// No snapshot has ever been committed for the entity
    #[error("{0} has not been analyzed yet")]
    NotYetAnalyzed(EntityId),

    /// The entity has snapshots, but none for this cycle
    #[error("No snapshot for {entity_id} in cycle {cycle_id}")]
    CycleNotFound {
        /// Entity queried
        entity_id: EntityId,
        /// Cycle queried
        cycle_id: CycleId,
    },

    /// Store unavailable (lock poisoned or read failure)
    #[error("Store error: {0}")]
    Store(String),
}

/// An event could not be delivered
///
/// Never fatal: the snapshot is authoritative and consumers reconcile with
/// pull queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventPublishError {
    /// Nobody is subscribed
    #[error("No subscribers for {0} event")]
    NoSubscribers(&'static str),
}
