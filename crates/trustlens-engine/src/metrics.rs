//! Counters across cycles

use crate::CycleReport;
use std::collections::BTreeMap;
use trustlens_domain::SourceId;

/// Metrics collected while running cycles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineMetrics {
    /// Cycles run to completion
    pub cycle_count: usize,

    /// Cycles cut short by cancellation
    pub cancelled_cycles: usize,

    /// Snapshots committed
    pub committed: usize,

    /// Entities skipped for lack of evidence
    pub skipped: usize,

    /// Entities whose scoring or write failed
    pub failed: usize,

    /// Entities left uncommitted by a cancelled cycle
    pub aborted: usize,

    /// Update events that reached no subscriber
    pub publish_failures: usize,

    /// Cycles in which each source was degraded
    pub degraded: BTreeMap<SourceId, usize>,

    /// Adapter calls, retries included
    pub adapter_calls: u64,

    /// Sum of adapter call costs
    pub estimated_cost: f64,

    /// Wall time spent in cycles (milliseconds)
    pub total_runtime_ms: u64,
}

impl EngineMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cycle's report into the totals
    pub fn record_cycle(&mut self, report: &CycleReport) {
        if report.cancelled {
            self.cancelled_cycles += 1;
        } else {
            self.cycle_count += 1;
        }
        self.committed += report.committed.len();
        self.skipped += report.skipped.len();
        self.failed += report.failed.len();
        self.aborted += report.aborted.len();
        self.publish_failures += report.undelivered;
        for source in report.degraded_sources.keys() {
            self.record_degraded(source);
        }
        self.adapter_calls += u64::from(report.stats.adapter_calls);
        self.estimated_cost += report.stats.estimated_cost;
        self.total_runtime_ms += report.finished_at.saturating_sub(report.started_at);
    }

    /// Record one degraded observation for a source
    pub fn record_degraded(&mut self, source: &SourceId) {
        *self.degraded.entry(source.clone()).or_insert(0) += 1;
    }

    /// Total degraded observations across sources
    pub fn total_degraded(&self) -> usize {
        self.degraded.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Engine Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Cycles: {}", self.cycle_count),
            format!("Cancelled cycles: {}", self.cancelled_cycles),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
            format!("Committed: {}", self.committed),
            format!("Skipped: {}", self.skipped),
            format!("Failed: {}", self.failed),
            format!("Aborted: {}", self.aborted),
            format!("Undelivered events: {}", self.publish_failures),
            format!(
                "Adapter calls: {} (estimated cost {:.2})",
                self.adapter_calls, self.estimated_cost
            ),
        ];

        if !self.degraded.is_empty() {
            lines.push(String::new());
            lines.push("Degraded sources:".to_string());
            for (source, count) in &self.degraded {
                lines.push(format!("  {}: {} cycles", source, count));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use trustlens_collector::CollectionStats;
    use trustlens_domain::{CycleId, CycleTrigger, EntityId};

    fn report(cancelled: bool) -> CycleReport {
        let mut degraded = BTreeMap::new();
        degraded.insert(SourceId::new("regulator"), "401 Unauthorized".to_string());
        CycleReport {
            cycle_id: CycleId::new(),
            trigger: CycleTrigger::Scheduled,
            committed: vec![EntityId::new("a"), EntityId::new("b")],
            skipped: vec![EntityId::new("c")],
            failed: Vec::new(),
            aborted: Vec::new(),
            degraded_sources: degraded,
            undelivered: 2,
            stats: CollectionStats {
                requested: 6,
                adapter_calls: 7,
                estimated_cost: 0.7,
            },
            cancelled,
            started_at: 1_000,
            finished_at: 1_250,
        }
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.cycle_count, 0);
        assert_eq!(metrics.total_degraded(), 0);
    }

    #[test]
    fn test_record_cycle() {
        let mut metrics = EngineMetrics::new();
        metrics.record_cycle(&report(false));
        metrics.record_cycle(&report(false));

        assert_eq!(metrics.cycle_count, 2);
        assert_eq!(metrics.committed, 4);
        assert_eq!(metrics.skipped, 2);
        assert_eq!(metrics.publish_failures, 4);
        assert_eq!(metrics.degraded[&SourceId::new("regulator")], 2);
        assert_eq!(metrics.adapter_calls, 14);
        assert_eq!(metrics.total_runtime_ms, 500);
    }

    #[test]
    fn test_cancelled_cycle_counted_separately() {
        let mut metrics = EngineMetrics::new();
        metrics.record_cycle(&report(true));
        assert_eq!(metrics.cycle_count, 0);
        assert_eq!(metrics.cancelled_cycles, 1);
    }

    #[test]
    fn test_reset() {
        let mut metrics = EngineMetrics::new();
        metrics.record_cycle(&report(false));
        metrics.reset();
        assert_eq!(metrics, EngineMetrics::default());
    }

    #[test]
    fn test_summary() {
        let mut metrics = EngineMetrics::new();
        metrics.record_cycle(&report(false));

        let summary = metrics.summary();
        assert!(summary.contains("Cycles: 1"));
        assert!(summary.contains("Committed: 2"));
        assert!(summary.contains("Undelivered events: 2"));
        assert!(summary.contains("regulator: 1 cycles"));
    }
}
