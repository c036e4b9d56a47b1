//! Composite scorer: metrics → one explainable score

use crate::engine::MetricReport;
use crate::{MetricPolicy, ScoringConfig, ScoringConfigError};
use trustlens_domain::{
    CategoryScore, CompositeScore, CycleId, EntityId, Metric, MetricCategory, ProvenanceSummary,
    RationaleEntry,
};

/// Round to `places` decimal places
fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Combines metrics into a [`CompositeScore`]
///
/// A metric's value is shrunk toward its neutral default by its confidence
/// (`c·v + (1−c)·neutral`) before weighting, so thin evidence moves the
/// score less than strong evidence.
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    category_weights: [f64; 5],
    policies: Vec<MetricPolicy>,
    low_confidence_threshold: f64,
    rationale_top_k: usize,
    rationale_baseline: f64,
}

impl CompositeScorer {
    /// Create a scorer from a scoring policy
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringConfigError> {
        config.validate()?;
        Ok(Self {
            category_weights: config.category_weights.as_array(),
            policies: config.ordered_policies(),
            low_confidence_threshold: config.low_confidence_threshold,
            rationale_top_k: config.rationale_top_k,
            rationale_baseline: config.rationale_baseline,
        })
    }

    fn policy(&self, metric: &Metric) -> Option<&MetricPolicy> {
        self.policies.iter().find(|p| p.metric == metric.name)
    }

    fn effective_value(&self, metric: &Metric) -> f64 {
        let neutral = self.policy(metric).map(|p| p.neutral).unwrap_or(metric.value);
        metric.confidence * metric.value + (1.0 - metric.confidence) * neutral
    }

    fn metric_weight(&self, metric: &Metric) -> f64 {
        self.policy(metric).map(|p| p.weight).unwrap_or(0.0)
    }

    /// Score one entity for one cycle
    ///
    /// `provenance` carries the signal counts gathered by the collector; the
    /// scorer fills in missing/extraction counts and the low-confidence flag.
    pub fn score(
        &self,
        entity_id: EntityId,
        cycle_id: CycleId,
        report: &MetricReport,
        mut provenance: ProvenanceSummary,
    ) -> CompositeScore {
        let category_breakdown = MetricCategory::ALL.map(|category| {
            let (score, confidence) = report
                .metrics
                .iter()
                .filter(|m| m.category == category)
                .fold((0.0, 0.0), |(s, c), m| {
                    let w = self.metric_weight(m);
                    (s + w * self.effective_value(m), c + w * m.confidence)
                });

            CategoryScore {
                category,
                score: round_to(score.clamp(0.0, 100.0), 2),
                confidence: round_to(confidence.clamp(0.0, 1.0), 4),
                weight: self.category_weights[category.index()],
            }
        });

        // Aggregate from unrounded category values so rounding never compounds
        let (overall, confidence) = report.metrics.iter().fold((0.0, 0.0), |(s, c), m| {
            let w = self.category_weights[m.category.index()] * self.metric_weight(m);
            (s + w * self.effective_value(m), c + w * m.confidence)
        });
        let overall = round_to(overall.clamp(0.0, 100.0), 2);
        let confidence = round_to(confidence.clamp(0.0, 1.0), 4);

        provenance.missing = report.missing_inputs;
        provenance.extraction_failures = report.extraction_failures.len() as u32;
        provenance.low_confidence = confidence < self.low_confidence_threshold;

        CompositeScore {
            entity_id,
            cycle_id,
            overall,
            category_breakdown,
            confidence,
            rationale: self.rationale(&report.metrics),
            provenance_summary: provenance,
            metrics: report.metrics.clone(),
        }
    }

    /// Top-k metrics that cost the most points against the baseline
    ///
    /// Ties keep declaration order.
    fn rationale(&self, metrics: &[Metric]) -> Vec<RationaleEntry> {
        let mut gaps: Vec<(f64, &Metric)> = metrics
            .iter()
            .map(|m| {
                let w = self.category_weights[m.category.index()] * self.metric_weight(m);
                (w * (self.rationale_baseline - self.effective_value(m)), m)
            })
            .filter(|(gap, _)| *gap > 1e-9)
            .collect();

        gaps.sort_by_key(|(_, m)| m.name.declaration_index());
        gaps.sort_by(|a, b| b.0.total_cmp(&a.0));

        gaps.into_iter()
            .take(self.rationale_top_k)
            .map(|(gap, m)| RationaleEntry {
                metric: m.name,
                category: m.category,
                value: round_to(m.value, 2),
                magnitude: round_to(gap, 2),
            })
            .collect()
    }
}
