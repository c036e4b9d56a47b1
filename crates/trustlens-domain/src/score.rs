//! Composite scores

use crate::{CycleId, EntityId, Metric, MetricCategory, MetricKind, ProvenanceSummary};
use serde::{Deserialize, Serialize};

/// Score for one category within a composite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// The category
    pub category: MetricCategory,
    /// Category score [0, 100]
    pub score: f64,
    /// Weighted confidence of the category's metrics [0.0, 1.0]
    pub confidence: f64,
    /// Weight of this category in the overall score
    pub weight: f64,
}

/// One line of the score explanation: a metric that pulled the score down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RationaleEntry {
    /// Metric responsible
    pub metric: MetricKind,
    /// Its category
    pub category: MetricCategory,
    /// The metric's (unshrunk) value
    pub value: f64,
    /// Points of overall score lost against the baseline
    pub magnitude: f64,
}

/// The weighted aggregate of all metrics for one entity in one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    /// Entity scored
    pub entity_id: EntityId,
    /// Cycle that produced the score
    pub cycle_id: CycleId,
    /// Overall score [0, 100]
    pub overall: f64,
    /// Exactly one entry per category, in [`MetricCategory::ALL`] order
    pub category_breakdown: [CategoryScore; 5],
    /// Overall confidence [0.0, 1.0]
    pub confidence: f64,
    /// Top negative contributors, largest first
    pub rationale: Vec<RationaleEntry>,
    /// How the evidence was obtained
    pub provenance_summary: ProvenanceSummary,
    /// All metrics, in declaration order
    pub metrics: Vec<Metric>,
}

impl CompositeScore {
    /// Breakdown entry for a category
    pub fn category(&self, category: MetricCategory) -> &CategoryScore {
        &self.category_breakdown[category.index()]
    }

    /// Metric by kind, if it was computed
    pub fn metric(&self, kind: MetricKind) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == kind)
    }

    /// Whether consumers should render the score as low-confidence
    pub fn is_low_confidence(&self) -> bool {
        self.provenance_summary.low_confidence
    }
}
