//! Metric categories

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five scoring categories
///
/// Every composite score carries exactly one breakdown entry per category,
/// in the order of [`MetricCategory::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    /// Game fairness: disclosed vs observed return, RNG certification
    Fairness,
    /// Whether and how fast players get paid
    PayoutReliability,
    /// Customer support quality
    Support,
    /// Licensing and regulatory standing
    Compliance,
    /// Quality of bonus terms and conditions
    BonusTerms,
}

impl MetricCategory {
    /// All categories in declaration order
    pub const ALL: [MetricCategory; 5] = [
        MetricCategory::Fairness,
        MetricCategory::PayoutReliability,
        MetricCategory::Support,
        MetricCategory::Compliance,
        MetricCategory::BonusTerms,
    ];

    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Fairness => "fairness",
            MetricCategory::PayoutReliability => "payout_reliability",
            MetricCategory::Support => "support",
            MetricCategory::Compliance => "compliance",
            MetricCategory::BonusTerms => "bonus_terms",
        }
    }

    /// Position in [`MetricCategory::ALL`]
    pub fn index(&self) -> usize {
        match self {
            MetricCategory::Fairness => 0,
            MetricCategory::PayoutReliability => 1,
            MetricCategory::Support => 2,
            MetricCategory::Compliance => 3,
            MetricCategory::BonusTerms => 4,
        }
    }

    /// Parse a category from a string
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
