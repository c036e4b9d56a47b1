//! Raw evidence fetched from sources

use crate::{EntityId, Provenance, SourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of evidence a source can provide
///
/// The set is closed: every metric input is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Return-to-player rate the operator publishes
    DisclosedRate,
    /// Return-to-player rate measured by an independent observer
    ObservedRate,
    /// RNG / game fairness certification status
    RngCertification,
    /// Withdrawal processing times
    PayoutTimes,
    /// Player complaints over a lookback window
    Complaints,
    /// Customer support response times
    SupportResponse,
    /// Gambling license status
    LicenseStatus,
    /// Fines and warnings issued by regulators
    RegulatoryActions,
    /// Bonus terms and conditions
    BonusTerms,
}

impl SignalType {
    /// All signal types in declaration order
    pub const ALL: [SignalType; 9] = [
        SignalType::DisclosedRate,
        SignalType::ObservedRate,
        SignalType::RngCertification,
        SignalType::PayoutTimes,
        SignalType::Complaints,
        SignalType::SupportResponse,
        SignalType::LicenseStatus,
        SignalType::RegulatoryActions,
        SignalType::BonusTerms,
    ];

    /// Get the signal type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::DisclosedRate => "disclosed_rate",
            SignalType::ObservedRate => "observed_rate",
            SignalType::RngCertification => "rng_certification",
            SignalType::PayoutTimes => "payout_times",
            SignalType::Complaints => "complaints",
            SignalType::SupportResponse => "support_response",
            SignalType::LicenseStatus => "license_status",
            SignalType::RegulatoryActions => "regulatory_actions",
            SignalType::BonusTerms => "bonus_terms",
        }
    }

    /// Parse a signal type from a string
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid signal type: {}", s))
    }
}

/// One fetched piece of evidence
///
/// Immutable once written; a newer fetch supersedes it rather than
/// mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    /// Source that produced the signal
    pub source_id: SourceId,
    /// Entity the signal is about
    pub entity_id: EntityId,
    /// What kind of evidence this is
    pub signal_type: SignalType,
    /// Raw extracted payload (`null` for fallbacks)
    pub payload: serde_json::Value,
    /// Reliability of this signal [0.0, 1.0]
    pub confidence: f64,
    /// When the underlying fetch happened (ms since epoch)
    pub fetched_at: u64,
    /// Where the value came from in this cycle
    pub provenance: Provenance,
}

impl SignalResult {
    /// Create a live signal result
    pub fn live(
        source_id: SourceId,
        entity_id: EntityId,
        signal_type: SignalType,
        payload: serde_json::Value,
        confidence: f64,
        fetched_at: u64,
    ) -> Self {
        Self {
            source_id,
            entity_id,
            signal_type,
            payload,
            confidence: crate::confidence::clamp(confidence),
            fetched_at,
            provenance: Provenance::Live,
        }
    }

    /// Create a fallback result carrying no evidence
    pub fn fallback(
        source_id: SourceId,
        entity_id: EntityId,
        signal_type: SignalType,
        confidence: f64,
        at: u64,
    ) -> Self {
        Self {
            source_id,
            entity_id,
            signal_type,
            payload: serde_json::Value::Null,
            confidence: crate::confidence::clamp(confidence),
            fetched_at: at,
            provenance: Provenance::Fallback,
        }
    }

    /// Age of the signal at `now` in milliseconds
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.fetched_at)
    }

    /// True when the result carries real (live or cached) evidence
    pub fn is_evidence(&self) -> bool {
        self.provenance != Provenance::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_type_parse_roundtrip() {
        for t in SignalType::ALL {
            assert_eq!(SignalType::parse(t.as_str()), Some(t));
        }
        assert_eq!(SignalType::parse("weather"), None);
    }

    #[test]
    fn test_live_clamps_confidence() {
        let r = SignalResult::live(
            SourceId::new("s"),
            EntityId::new("e"),
            SignalType::Complaints,
            serde_json::json!({"total": 0}),
            1.7,
            10,
        );
        assert_eq!(r.confidence, 1.0);
        assert!(r.is_evidence());
        assert_eq!(r.age_ms(25), 15);
        assert_eq!(r.age_ms(5), 0);
    }

    #[test]
    fn test_fallback_has_null_payload() {
        let r = SignalResult::fallback(
            SourceId::new("s"),
            EntityId::new("e"),
            SignalType::BonusTerms,
            0.2,
            10,
        );
        assert!(r.payload.is_null());
        assert!(!r.is_evidence());
    }
}
