//! Metrics: one scored dimension per cycle

use crate::{MetricCategory, SignalType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of metrics, in declaration order
///
/// Declaration order is the tie-breaker for rationale ranking, so adding a
/// metric means appending it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Deviation between disclosed and observed return-to-player rate
    RtpAccuracy,
    /// RNG / game certification status
    RngCertification,
    /// Median withdrawal processing time
    PayoutSpeed,
    /// Payout-related complaint rate
    PayoutComplaints,
    /// Median support first-response time
    SupportResponsiveness,
    /// Share of complaints left unresolved
    ComplaintResolution,
    /// License validity and regulator tier
    LicenseStanding,
    /// Fines and warnings in the lookback window
    RegulatoryHistory,
    /// Wagering requirement severity
    WageringFairness,
    /// Count of restrictive or hidden clauses
    TermClarity,
}

impl MetricKind {
    /// All metrics in declaration order
    pub const ALL: [MetricKind; 10] = [
        MetricKind::RtpAccuracy,
        MetricKind::RngCertification,
        MetricKind::PayoutSpeed,
        MetricKind::PayoutComplaints,
        MetricKind::SupportResponsiveness,
        MetricKind::ComplaintResolution,
        MetricKind::LicenseStanding,
        MetricKind::RegulatoryHistory,
        MetricKind::WageringFairness,
        MetricKind::TermClarity,
    ];

    /// Get the metric name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::RtpAccuracy => "rtp_accuracy",
            MetricKind::RngCertification => "rng_certification",
            MetricKind::PayoutSpeed => "payout_speed",
            MetricKind::PayoutComplaints => "payout_complaints",
            MetricKind::SupportResponsiveness => "support_responsiveness",
            MetricKind::ComplaintResolution => "complaint_resolution",
            MetricKind::LicenseStanding => "license_standing",
            MetricKind::RegulatoryHistory => "regulatory_history",
            MetricKind::WageringFairness => "wagering_fairness",
            MetricKind::TermClarity => "term_clarity",
        }
    }

    /// Category the metric rolls up into
    pub fn category(&self) -> MetricCategory {
        match self {
            MetricKind::RtpAccuracy | MetricKind::RngCertification => MetricCategory::Fairness,
            MetricKind::PayoutSpeed | MetricKind::PayoutComplaints => {
                MetricCategory::PayoutReliability
            }
            MetricKind::SupportResponsiveness | MetricKind::ComplaintResolution => {
                MetricCategory::Support
            }
            MetricKind::LicenseStanding | MetricKind::RegulatoryHistory => {
                MetricCategory::Compliance
            }
            MetricKind::WageringFairness | MetricKind::TermClarity => MetricCategory::BonusTerms,
        }
    }

    /// Signal types the metric reads
    pub fn inputs(&self) -> &'static [SignalType] {
        match self {
            MetricKind::RtpAccuracy => &[SignalType::DisclosedRate, SignalType::ObservedRate],
            MetricKind::RngCertification => &[SignalType::RngCertification],
            MetricKind::PayoutSpeed => &[SignalType::PayoutTimes],
            MetricKind::PayoutComplaints => &[SignalType::Complaints],
            MetricKind::SupportResponsiveness => &[SignalType::SupportResponse],
            MetricKind::ComplaintResolution => &[SignalType::Complaints],
            MetricKind::LicenseStanding => &[SignalType::LicenseStatus],
            MetricKind::RegulatoryHistory => &[SignalType::RegulatoryActions],
            MetricKind::WageringFairness => &[SignalType::BonusTerms],
            MetricKind::TermClarity => &[SignalType::BonusTerms],
        }
    }

    /// Position in [`MetricKind::ALL`]
    pub fn declaration_index(&self) -> usize {
        Self::ALL.iter().position(|m| m == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One computed metric for one entity in one cycle
///
/// Produced fresh every cycle and only ever persisted embedded in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Which metric this is
    pub name: MetricKind,
    /// Category it belongs to
    pub category: MetricCategory,
    /// Score [0, 100]
    pub value: f64,
    /// Reliability [0.0, 1.0]
    pub confidence: f64,
    /// Signals that fed the value (live or cached only)
    pub contributing_signals: Vec<SignalType>,
    /// True when `value` is the metric's neutral default
    pub neutral: bool,
    /// When the metric was computed (ms since epoch)
    pub computed_at: u64,
}
