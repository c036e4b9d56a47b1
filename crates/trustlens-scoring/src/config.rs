//! Scoring policy: weights, neutral defaults and penalty curves
//!
//! Every number that influences a score lives here so that the policy can
//! be reviewed (and overridden) as TOML:
//!
//! ```toml
//! low_confidence_threshold = 0.5
//! rationale_top_k = 3
//!
//! [category_weights]
//! fairness = 0.30
//! payout_reliability = 0.25
//! support = 0.15
//! compliance = 0.20
//! bonus_terms = 0.10
//!
//! [[metrics]]
//! metric = "rtp_accuracy"
//! weight = 0.7
//! neutral = 50.0
//! curve = [[0.0, 100.0], [1.0, 95.0], [3.0, 80.0], [5.0, 65.0], [8.0, 45.0], [15.0, 10.0], [25.0, 0.0]]
//! ```

use crate::{PenaltyCurve, ScoringConfigError};
use serde::{Deserialize, Serialize};
use trustlens_domain::{MetricCategory, MetricKind};

/// Tolerance for "weights sum to 1"
const WEIGHT_EPSILON: f64 = 1e-6;

/// Weight of each category in the overall score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    /// Fairness weight
    pub fairness: f64,
    /// Payout reliability weight
    pub payout_reliability: f64,
    /// Support weight
    pub support: f64,
    /// Compliance weight
    pub compliance: f64,
    /// Bonus terms weight
    pub bonus_terms: f64,
}

impl CategoryWeights {
    /// Weight for a category
    pub fn get(&self, category: MetricCategory) -> f64 {
        match category {
            MetricCategory::Fairness => self.fairness,
            MetricCategory::PayoutReliability => self.payout_reliability,
            MetricCategory::Support => self.support,
            MetricCategory::Compliance => self.compliance,
            MetricCategory::BonusTerms => self.bonus_terms,
        }
    }

    /// Weights as an array in [`MetricCategory::ALL`] order
    pub fn as_array(&self) -> [f64; 5] {
        MetricCategory::ALL.map(|c| self.get(c))
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            fairness: 0.30,
            payout_reliability: 0.25,
            support: 0.15,
            compliance: 0.20,
            bonus_terms: 0.10,
        }
    }
}

/// Policy for a single metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPolicy {
    /// Metric this policy applies to
    pub metric: MetricKind,
    /// Weight within the metric's category
    pub weight: f64,
    /// Value used when evidence is missing, unparseable or a fallback
    pub neutral: f64,
    /// Deviation → score curve (absent for metrics with a discrete mapping)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<PenaltyCurve>,
}

impl MetricPolicy {
    fn new(metric: MetricKind, weight: f64, neutral: f64, curve: Option<Vec<(f64, f64)>>) -> Self {
        Self {
            metric,
            weight,
            neutral,
            curve: curve.map(PenaltyCurve::new),
        }
    }

    /// Whether this metric's value is derived through a curve
    pub fn requires_curve(metric: MetricKind) -> bool {
        !matches!(
            metric,
            MetricKind::RngCertification | MetricKind::LicenseStanding
        )
    }
}

/// Complete scoring policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Composite confidence below this marks the score low-confidence
    pub low_confidence_threshold: f64,

    /// Number of negative contributors listed in the rationale
    pub rationale_top_k: usize,

    /// Score a metric is compared against when ranking contributors
    #[serde(default = "default_rationale_baseline")]
    pub rationale_baseline: f64,

    /// Observed-rate sample size at which its confidence is no longer scaled down
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,

    /// Category weights (sum to 1)
    pub category_weights: CategoryWeights,

    /// One policy per metric; weights sum to 1 within each category
    pub metrics: Vec<MetricPolicy>,
}

fn default_rationale_baseline() -> f64 {
    100.0
}

fn default_min_sample_size() -> u64 {
    10_000
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use MetricKind::*;

        Self {
            low_confidence_threshold: 0.5,
            rationale_top_k: 3,
            rationale_baseline: default_rationale_baseline(),
            min_sample_size: default_min_sample_size(),
            category_weights: CategoryWeights::default(),
            metrics: vec![
                MetricPolicy::new(
                    RtpAccuracy,
                    0.7,
                    50.0,
                    Some(vec![
                        (0.0, 100.0),
                        (1.0, 95.0),
                        (3.0, 80.0),
                        (5.0, 65.0),
                        (8.0, 45.0),
                        (15.0, 10.0),
                        (25.0, 0.0),
                    ]),
                ),
                MetricPolicy::new(RngCertification, 0.3, 50.0, None),
                MetricPolicy::new(
                    PayoutSpeed,
                    0.5,
                    50.0,
                    Some(vec![
                        (24.0, 100.0),
                        (48.0, 90.0),
                        (72.0, 75.0),
                        (168.0, 40.0),
                        (336.0, 10.0),
                        (720.0, 0.0),
                    ]),
                ),
                MetricPolicy::new(
                    PayoutComplaints,
                    0.5,
                    75.0,
                    Some(vec![
                        (0.0, 100.0),
                        (1.0, 95.0),
                        (3.0, 85.0),
                        (10.0, 60.0),
                        (25.0, 30.0),
                        (50.0, 0.0),
                    ]),
                ),
                MetricPolicy::new(
                    SupportResponsiveness,
                    0.6,
                    50.0,
                    Some(vec![
                        (1.0, 100.0),
                        (4.0, 90.0),
                        (12.0, 75.0),
                        (24.0, 60.0),
                        (72.0, 30.0),
                        (168.0, 0.0),
                    ]),
                ),
                MetricPolicy::new(
                    ComplaintResolution,
                    0.4,
                    75.0,
                    Some(vec![
                        (0.0, 100.0),
                        (10.0, 90.0),
                        (25.0, 70.0),
                        (50.0, 40.0),
                        (100.0, 0.0),
                    ]),
                ),
                MetricPolicy::new(LicenseStanding, 0.6, 50.0, None),
                MetricPolicy::new(
                    RegulatoryHistory,
                    0.4,
                    75.0,
                    Some(vec![
                        (0.0, 100.0),
                        (1.0, 85.0),
                        (3.0, 65.0),
                        (6.0, 40.0),
                        (12.0, 0.0),
                    ]),
                ),
                MetricPolicy::new(
                    WageringFairness,
                    0.5,
                    50.0,
                    Some(vec![
                        (0.0, 100.0),
                        (20.0, 95.0),
                        (35.0, 75.0),
                        (50.0, 50.0),
                        (70.0, 25.0),
                        (100.0, 0.0),
                    ]),
                ),
                MetricPolicy::new(
                    TermClarity,
                    0.5,
                    50.0,
                    Some(vec![
                        (0.0, 100.0),
                        (1.0, 85.0),
                        (3.0, 60.0),
                        (6.0, 30.0),
                        (10.0, 0.0),
                    ]),
                ),
            ],
        }
    }
}

impl ScoringConfig {
    /// Validate weights, ranges, completeness and curve monotonicity
    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            return Err(ScoringConfigError::OutOfRange(format!(
                "low_confidence_threshold {} must be in [0, 1]",
                self.low_confidence_threshold
            )));
        }
        if !(0.0..=100.0).contains(&self.rationale_baseline) {
            return Err(ScoringConfigError::OutOfRange(format!(
                "rationale_baseline {} must be in [0, 100]",
                self.rationale_baseline
            )));
        }
        if self.min_sample_size == 0 {
            return Err(ScoringConfigError::OutOfRange(
                "min_sample_size must be greater than 0".to_string(),
            ));
        }

        let category_weights = self.category_weights.as_array();
        check_weights("categories", &category_weights)?;

        for kind in MetricKind::ALL {
            let count = self.metrics.iter().filter(|p| p.metric == kind).count();
            if count != 1 {
                return Err(ScoringConfigError::Policy(format!(
                    "metric {} must appear exactly once (found {})",
                    kind, count
                )));
            }
        }

        for policy in &self.metrics {
            if !(0.0..=100.0).contains(&policy.neutral) {
                return Err(ScoringConfigError::OutOfRange(format!(
                    "neutral default {} for {} must be in [0, 100]",
                    policy.neutral, policy.metric
                )));
            }
            match (&policy.curve, MetricPolicy::requires_curve(policy.metric)) {
                (Some(curve), _) => curve.validate().map_err(|reason| ScoringConfigError::Curve {
                    metric: policy.metric.to_string(),
                    reason,
                })?,
                (None, true) => {
                    return Err(ScoringConfigError::Curve {
                        metric: policy.metric.to_string(),
                        reason: "curve is required".to_string(),
                    })
                }
                (None, false) => {}
            }
        }

        for category in MetricCategory::ALL {
            let weights: Vec<f64> = self
                .metrics
                .iter()
                .filter(|p| p.metric.category() == category)
                .map(|p| p.weight)
                .collect();
            check_weights(category.as_str(), &weights)?;
        }

        Ok(())
    }

    /// Policies in metric declaration order
    ///
    /// Assumes the config has been validated.
    pub fn ordered_policies(&self) -> Vec<MetricPolicy> {
        let mut policies = self.metrics.clone();
        policies.sort_by_key(|p| p.metric.declaration_index());
        policies
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ScoringConfigError> {
        toml::from_str(toml_str).map_err(|e| ScoringConfigError::Toml(e.to_string()))
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, ScoringConfigError> {
        toml::to_string_pretty(self).map_err(|e| ScoringConfigError::Toml(e.to_string()))
    }
}

fn check_weights(group: &str, weights: &[f64]) -> Result<(), ScoringConfigError> {
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(ScoringConfigError::OutOfRange(format!(
            "weight {} in {} must be a non-negative number",
            w, group
        )));
    }

    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_EPSILON {
        return Err(ScoringConfigError::WeightSum {
            group: group.to_string(),
            sum,
        });
    }
    Ok(())
}
