//! Rollup: latest-state cache over the snapshot store
//!
//! Commits go store → cache → bus, all under one lock, so:
//!
//! - an event is only ever published for a snapshot that is already durable
//! - anyone reacting to an event can pull the same snapshot immediately
//! - per entity, events leave in non-decreasing cycle order
//!
//! The cache is rebuilt from the store when the rollup is opened; events are
//! notifications, never the system of record.

use crate::{EventBus, EventPublishError, QueryError, RollupError, Subscription};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard, RwLock};
use tracing::{error, info, warn};
use trustlens_domain::traits::SnapshotStore;
use trustlens_domain::{
    now_millis, CompositeScore, CycleId, CycleOutcome, CycleRecord, CycleTrigger, DegradedNotice,
    EntityId, SkipNotice, Snapshot, SourceId, TrustEvent, UpdateEvent,
};

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    /// Entity committed
    pub entity_id: EntityId,
    /// Cycle committed
    pub cycle_id: CycleId,
    /// Subscribers reached, or why the event went nowhere
    pub delivery: Result<usize, EventPublishError>,
}

/// Push and pull access to committed trust scores
pub struct Rollup<S>
where
    S: SnapshotStore,
{
    store: Mutex<S>,
    latest: RwLock<HashMap<EntityId, Snapshot>>,
    bus: EventBus,
}

impl<S> Rollup<S>
where
    S: SnapshotStore,
    S::Error: Display,
{
    /// Open a rollup over `store`, rehydrating the latest-state cache
    pub fn open(store: S, bus: EventBus) -> Result<Self, RollupError> {
        let rollup = Self {
            store: Mutex::new(store),
            latest: RwLock::new(HashMap::new()),
            bus,
        };
        let count = rollup.rehydrate()?;
        info!("Rollup rehydrated {} entities from the snapshot store", count);
        Ok(rollup)
    }

    fn store(&self) -> Result<MutexGuard<'_, S>, String> {
        self.store
            .lock()
            .map_err(|e| format!("Store lock error: {}", e))
    }

    /// Rebuild the cache from the store; returns the number of entities
    pub fn rehydrate(&self) -> Result<usize, RollupError> {
        let store = self.store().map_err(RollupError::Store)?;
        let snapshots = store
            .latest_all()
            .map_err(|e| RollupError::Store(e.to_string()))?;

        let mut latest = self
            .latest
            .write()
            .map_err(|e| RollupError::Store(format!("Cache lock error: {}", e)))?;
        latest.clear();
        for snapshot in snapshots {
            latest.insert(snapshot.entity_id.clone(), snapshot);
        }
        Ok(latest.len())
    }

    /// Commit a snapshot, then publish its update event
    ///
    /// The snapshot write and latest-pointer move are atomic in the store.
    /// A publish failure is logged and reported in the receipt, never
    /// returned as an error.
    pub fn commit_and_publish(
        &self,
        snapshot: Snapshot,
        trigger: CycleTrigger,
    ) -> Result<CommitReceipt, RollupError> {
        let entity_id = snapshot.entity_id.clone();
        let cycle_id = snapshot.cycle_id;

        let mut store = self.store().map_err(RollupError::Store)?;

        if let Some(current) = self.cached(&entity_id) {
            if cycle_id < current.cycle_id {
                return Err(RollupError::OutOfOrder {
                    entity_id,
                    latest: current.cycle_id,
                    attempted: cycle_id,
                });
            }
        }

        if let Err(e) = store.commit(&snapshot) {
            error!(
                "Snapshot write failed for {} in cycle {}: {}",
                entity_id, cycle_id, e
            );
            return Err(RollupError::SnapshotWrite {
                entity_id,
                cycle_id,
                reason: e.to_string(),
            });
        }

        let record = CycleRecord {
            cycle_id,
            entity_id: entity_id.clone(),
            trigger,
            outcome: CycleOutcome::Committed,
            recorded_at: snapshot.stored_at,
        };
        if let Err(e) = store.record_cycle(&record) {
            warn!("Failed to log committed cycle for {}: {}", entity_id, e);
        }

        let event = TrustEvent::TrustUpdated(UpdateEvent::from_snapshot(&snapshot, now_millis()));
        match self.latest.write() {
            Ok(mut latest) => {
                latest.insert(entity_id.clone(), snapshot);
            }
            Err(e) => warn!("Cache lock error, {} served from store only: {}", entity_id, e),
        }

        let delivery = self.bus.publish(event);
        if let Err(e) = &delivery {
            warn!("Update for {} in cycle {} not delivered: {}", entity_id, cycle_id, e);
        }
        drop(store);

        Ok(CommitReceipt {
            entity_id,
            cycle_id,
            delivery,
        })
    }

    /// Record a non-committed outcome (skipped, failed, aborted)
    ///
    /// Skips are also announced on the bus.
    pub fn record_outcome(&self, record: CycleRecord) -> Result<(), RollupError> {
        let mut store = self.store().map_err(RollupError::Store)?;
        store
            .record_cycle(&record)
            .map_err(|e| RollupError::Store(e.to_string()))?;

        if let CycleOutcome::Skipped { reason } = &record.outcome {
            let notice = TrustEvent::CycleSkipped(SkipNotice {
                entity_id: record.entity_id.clone(),
                cycle_id: record.cycle_id,
                reason: reason.clone(),
                published_at: now_millis(),
            });
            if let Err(e) = self.bus.publish(notice) {
                warn!("Skip notice for {} not delivered: {}", record.entity_id, e);
            }
        }
        Ok(())
    }

    /// Announce a degraded source
    pub fn publish_degraded(
        &self,
        source_id: SourceId,
        cycle_id: CycleId,
        reason: String,
    ) -> Result<usize, EventPublishError> {
        self.bus.publish(TrustEvent::SourceDegraded(DegradedNotice {
            source_id,
            cycle_id,
            reason,
            published_at: now_millis(),
        }))
    }

    fn cached(&self, entity_id: &EntityId) -> Option<Snapshot> {
        self.latest
            .read()
            .ok()
            .and_then(|latest| latest.get(entity_id).cloned())
    }

    /// Latest committed snapshot for an entity
    pub fn latest_snapshot(&self, entity_id: &EntityId) -> Result<Snapshot, QueryError> {
        if let Some(snapshot) = self.cached(entity_id) {
            return Ok(snapshot);
        }

        let store = self.store().map_err(QueryError::Store)?;
        store
            .latest(entity_id)
            .map_err(|e| QueryError::Store(e.to_string()))?
            .ok_or_else(|| QueryError::NotYetAnalyzed(entity_id.clone()))
    }

    /// Latest committed score for an entity
    pub fn latest_score(&self, entity_id: &EntityId) -> Result<CompositeScore, QueryError> {
        self.latest_snapshot(entity_id).map(|s| s.composite_score)
    }

    /// Score committed for an entity in a specific cycle
    pub fn score_at_cycle(
        &self,
        entity_id: &EntityId,
        cycle_id: CycleId,
    ) -> Result<CompositeScore, QueryError> {
        if let Some(snapshot) = self.cached(entity_id) {
            if snapshot.cycle_id == cycle_id {
                return Ok(snapshot.composite_score);
            }
        }

        let store = self.store().map_err(QueryError::Store)?;
        match store
            .at_cycle(entity_id, cycle_id)
            .map_err(|e| QueryError::Store(e.to_string()))?
        {
            Some(snapshot) => Ok(snapshot.composite_score),
            None => {
                let analyzed = self.cached(entity_id).is_some()
                    || store
                        .latest(entity_id)
                        .map_err(|e| QueryError::Store(e.to_string()))?
                        .is_some();
                if analyzed {
                    Err(QueryError::CycleNotFound {
                        entity_id: entity_id.clone(),
                        cycle_id,
                    })
                } else {
                    Err(QueryError::NotYetAnalyzed(entity_id.clone()))
                }
            }
        }
    }

    /// Committed snapshots for an entity, newest first
    pub fn history(&self, entity_id: &EntityId, limit: usize) -> Result<Vec<Snapshot>, QueryError> {
        let store = self.store().map_err(QueryError::Store)?;
        let history = store
            .history(entity_id, limit)
            .map_err(|e| QueryError::Store(e.to_string()))?;

        if history.is_empty() {
            return Err(QueryError::NotYetAnalyzed(entity_id.clone()));
        }
        Ok(history)
    }

    /// Per-entity outcomes recorded for a cycle
    pub fn cycle_records(&self, cycle_id: CycleId) -> Result<Vec<CycleRecord>, QueryError> {
        let store = self.store().map_err(QueryError::Store)?;
        store
            .cycle_records(cycle_id)
            .map_err(|e| QueryError::Store(e.to_string()))
    }

    /// Latest snapshot of every analyzed entity, sorted by entity id
    pub fn latest_all(&self) -> Vec<Snapshot> {
        let mut all: Vec<Snapshot> = self
            .latest
            .read()
            .map(|latest| latest.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        all
    }

    /// Number of entities with a committed snapshot
    pub fn analyzed_count(&self) -> usize {
        self.latest.read().map(|latest| latest.len()).unwrap_or(0)
    }

    /// Push subscription, optionally limited to one entity
    pub fn subscribe(&self, entity_id: Option<EntityId>) -> Subscription {
        self.bus.subscribe(entity_id)
    }

    /// The event bus this rollup publishes on
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}
