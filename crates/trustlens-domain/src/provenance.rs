//! Provenance tracking for signals and scores

use crate::SourceId;
use serde::{Deserialize, Serialize};

/// Where a signal value came from in a given cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Fetched from the source during this cycle
    Live,
    /// Served from the signal cache within its TTL
    Cached,
    /// Documented neutral substitute; carries no evidence
    Fallback,
}

impl Provenance {
    /// Get the provenance name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Cached => "cached",
            Provenance::Fallback => "fallback",
        }
    }
}

/// How the evidence behind one composite score was obtained
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceSummary {
    /// Signals fetched live this cycle
    pub live: u32,
    /// Signals served from cache
    pub cached: u32,
    /// Signals substituted with a fallback
    pub fallback: u32,
    /// Metric inputs with no signal at all
    pub missing: u32,
    /// Signals whose payload could not be parsed
    pub extraction_failures: u32,
    /// Sources flagged degraded (auth/config failures) for this entity
    #[serde(default)]
    pub degraded_sources: Vec<SourceId>,
    /// Set when composite confidence is under the configured threshold
    pub low_confidence: bool,
}

impl ProvenanceSummary {
    /// Count one signal with the given provenance
    pub fn record(&mut self, provenance: Provenance) {
        match provenance {
            Provenance::Live => self.live += 1,
            Provenance::Cached => self.cached += 1,
            Provenance::Fallback => self.fallback += 1,
        }
    }

    /// Total signals seen (live + cached + fallback)
    pub fn total_signals(&self) -> u32 {
        self.live + self.cached + self.fallback
    }

    /// True when no live or cached evidence backed the score
    pub fn has_no_evidence(&self) -> bool {
        self.live == 0 && self.cached == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut summary = ProvenanceSummary::default();
        summary.record(Provenance::Live);
        summary.record(Provenance::Live);
        summary.record(Provenance::Cached);
        summary.record(Provenance::Fallback);

        assert_eq!(summary.live, 2);
        assert_eq!(summary.cached, 1);
        assert_eq!(summary.fallback, 1);
        assert_eq!(summary.total_signals(), 4);
        assert!(!summary.has_no_evidence());
    }

    #[test]
    fn test_fallback_only_has_no_evidence() {
        let mut summary = ProvenanceSummary::default();
        summary.record(Provenance::Fallback);
        assert!(summary.has_no_evidence());
    }
}
