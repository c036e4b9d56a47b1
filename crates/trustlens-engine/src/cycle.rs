//! One collection-and-scoring run over every tracked entity
//!
//! ```text
//! collect ──▶ for each entity (declaration order):
//!               no evidence  → record skipped, publish skip notice
//!               otherwise    → metrics → composite → snapshot → commit → publish
//! ```
//!
//! Collection is the only phase that suspends on the network. Cancellation
//! during collection writes nothing. Cancellation during the commit phase
//! stops before the next entity; what is already committed stays, the rest
//! is recorded as aborted.

use crate::EngineMetrics;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trustlens_collector::{CollectionStats, EntitySignals, SignalCollector};
use trustlens_domain::traits::SnapshotStore;
use trustlens_domain::{
    now_millis, CycleId, CycleOutcome, CycleRecord, CycleTrigger, EntityId, Snapshot, SourceId,
    TrackedEntity,
};
use trustlens_rollup::Rollup;
use trustlens_scoring::{CompositeScorer, MetricEngine, ScoringConfig, ScoringConfigError};

/// What one cycle did to each entity
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Cycle identifier
    pub cycle_id: CycleId,
    /// What started the cycle
    pub trigger: CycleTrigger,
    /// Entities with a new snapshot
    pub committed: Vec<EntityId>,
    /// Entities with no usable evidence
    pub skipped: Vec<EntityId>,
    /// Entities whose write failed, with the error
    pub failed: Vec<(EntityId, String)>,
    /// Entities not reached before cancellation
    pub aborted: Vec<EntityId>,
    /// Sources degraded this cycle, with the first failure seen
    pub degraded_sources: BTreeMap<SourceId, String>,
    /// Committed snapshots whose update event reached nobody
    pub undelivered: usize,
    /// Adapter call accounting
    pub stats: CollectionStats,
    /// Whether the cycle was cut short
    pub cancelled: bool,
    /// Start time (ms since epoch)
    pub started_at: u64,
    /// End time (ms since epoch)
    pub finished_at: u64,
}

impl CycleReport {
    fn new(cycle_id: CycleId, trigger: CycleTrigger) -> Self {
        let started_at = now_millis();
        Self {
            cycle_id,
            trigger,
            committed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            aborted: Vec::new(),
            degraded_sources: BTreeMap::new(),
            undelivered: 0,
            stats: CollectionStats::default(),
            cancelled: false,
            started_at,
            finished_at: started_at,
        }
    }

    /// One-line description for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "Cycle {} ({}{}): {} committed, {} skipped, {} failed, {} aborted, {} degraded sources, {} adapter calls",
            self.cycle_id,
            self.trigger.as_str(),
            if self.cancelled { ", cancelled" } else { "" },
            self.committed.len(),
            self.skipped.len(),
            self.failed.len(),
            self.aborted.len(),
            self.degraded_sources.len(),
            self.stats.adapter_calls
        )
    }
}

enum EntityOutcome {
    Committed { delivered: bool },
    Skipped,
    Failed(String),
}

/// Runs cycles; at most one at a time
pub struct CycleRunner<S>
where
    S: SnapshotStore,
{
    collector: SignalCollector,
    metric_engine: MetricEngine,
    scorer: CompositeScorer,
    rollup: Arc<Rollup<S>>,
    entities: Vec<TrackedEntity>,
    running: tokio::sync::Mutex<()>,
    metrics: Mutex<EngineMetrics>,
}

impl<S> CycleRunner<S>
where
    S: SnapshotStore,
    S::Error: Display,
{
    /// Create a runner over a collector with its adapters already registered
    pub fn new(
        collector: SignalCollector,
        scoring: &ScoringConfig,
        rollup: Arc<Rollup<S>>,
        entities: Vec<TrackedEntity>,
    ) -> Result<Self, ScoringConfigError> {
        Ok(Self {
            collector,
            metric_engine: MetricEngine::new(scoring)?,
            scorer: CompositeScorer::new(scoring)?,
            rollup,
            entities,
            running: tokio::sync::Mutex::new(()),
            metrics: Mutex::new(EngineMetrics::new()),
        })
    }

    /// Push and pull access to committed scores
    pub fn rollup(&self) -> &Arc<Rollup<S>> {
        &self.rollup
    }

    /// The signal collector
    pub fn collector(&self) -> &SignalCollector {
        &self.collector
    }

    /// Tracked entities, in processing order
    pub fn entities(&self) -> &[TrackedEntity] {
        &self.entities
    }

    fn metrics_guard(&self) -> MutexGuard<'_, EngineMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Totals across every cycle run so far
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics_guard().clone()
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&self) {
        self.metrics_guard().reset();
    }

    /// Whether a cycle is in progress
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Run one cycle
    ///
    /// Waits for any cycle already in progress to finish first. Never fails
    /// as a whole: per-entity problems are reported in the [`CycleReport`].
    pub async fn run_cycle(&self, trigger: CycleTrigger, cancel: &CancellationToken) -> CycleReport {
        let _running = self.running.lock().await;

        let cycle_id = CycleId::new();
        let mut report = CycleReport::new(cycle_id, trigger);
        info!(
            "Cycle {} started ({}, {} entities)",
            cycle_id,
            trigger.as_str(),
            self.entities.len()
        );

        let collected = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            signals = self.collector.collect(&self.entities) => Some(signals),
        };
        let Some(collected) = collected else {
            warn!("Cycle {} cancelled during collection, nothing written", cycle_id);
            report.cancelled = true;
            report.aborted = self.entities.iter().map(|e| e.id.clone()).collect();
            return self.finish(report);
        };

        report.stats = collected.stats.clone();
        for (source_id, reason) in &collected.degraded_sources {
            warn!("Source {} degraded in cycle {}: {}", source_id, cycle_id, reason);
            if let Err(e) = self
                .rollup
                .publish_degraded(source_id.clone(), cycle_id, reason.clone())
            {
                debug!("Degraded notice for {} not delivered: {}", source_id, e);
            }
        }
        report.degraded_sources = collected.degraded_sources.clone();

        let no_signals = EntitySignals::default();
        for (index, entity) in self.entities.iter().enumerate() {
            if cancel.is_cancelled() {
                let remaining = &self.entities[index..];
                warn!(
                    "Cycle {} cancelled, {} entities left uncommitted",
                    cycle_id,
                    remaining.len()
                );
                for entity in remaining {
                    self.record(cycle_id, trigger, &entity.id, CycleOutcome::Aborted);
                    report.aborted.push(entity.id.clone());
                }
                report.cancelled = true;
                break;
            }

            let signals = collected.entity(&entity.id).unwrap_or(&no_signals);
            match self.process_entity(entity, cycle_id, trigger, signals) {
                EntityOutcome::Committed { delivered } => {
                    if !delivered {
                        report.undelivered += 1;
                    }
                    report.committed.push(entity.id.clone());
                }
                EntityOutcome::Skipped => report.skipped.push(entity.id.clone()),
                EntityOutcome::Failed(error) => report.failed.push((entity.id.clone(), error)),
            }

            // Let a pending shutdown land between entities
            tokio::task::yield_now().await;
        }

        self.finish(report)
    }

    fn process_entity(
        &self,
        entity: &TrackedEntity,
        cycle_id: CycleId,
        trigger: CycleTrigger,
        signals: &EntitySignals,
    ) -> EntityOutcome {
        if signals.has_no_evidence() {
            let reason = if entity.bindings.is_empty() {
                "no sources bound"
            } else {
                "no live or cached evidence"
            };
            info!("Skipping {} in cycle {}: {}", entity.id, cycle_id, reason);
            self.record(
                cycle_id,
                trigger,
                &entity.id,
                CycleOutcome::Skipped {
                    reason: reason.to_string(),
                },
            );
            return EntityOutcome::Skipped;
        }

        let metric_report = self.metric_engine.evaluate(&signals.signals, now_millis());
        let score = self.scorer.score(
            entity.id.clone(),
            cycle_id,
            &metric_report,
            signals.provenance.clone(),
        );
        debug!(
            "Scored {}: overall {:.2}, confidence {:.4}",
            entity.id, score.overall, score.confidence
        );

        match self
            .rollup
            .commit_and_publish(Snapshot::new(score, now_millis()), trigger)
        {
            Ok(receipt) => EntityOutcome::Committed {
                delivered: receipt.delivery.is_ok(),
            },
            Err(e) => {
                error!("Commit failed for {} in cycle {}: {}", entity.id, cycle_id, e);
                let message = e.to_string();
                self.record(
                    cycle_id,
                    trigger,
                    &entity.id,
                    CycleOutcome::Failed {
                        error: message.clone(),
                    },
                );
                EntityOutcome::Failed(message)
            }
        }
    }

    fn record(
        &self,
        cycle_id: CycleId,
        trigger: CycleTrigger,
        entity_id: &EntityId,
        outcome: CycleOutcome,
    ) {
        let label = outcome.as_str();
        let record = CycleRecord {
            cycle_id,
            entity_id: entity_id.clone(),
            trigger,
            outcome,
            recorded_at: now_millis(),
        };
        if let Err(e) = self.rollup.record_outcome(record) {
            warn!("Could not record {} outcome for {}: {}", label, entity_id, e);
        }
    }

    fn finish(&self, mut report: CycleReport) -> CycleReport {
        report.finished_at = now_millis();
        self.metrics_guard().record_cycle(&report);
        info!("{}", report.summary());
        report
    }
}
