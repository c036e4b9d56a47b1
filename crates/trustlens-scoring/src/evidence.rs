//! Typed views over raw signal payloads
//!
//! Sources hand back loosely-structured JSON. Each metric input is parsed
//! into one of the payload structs below; a payload that does not parse or
//! fails its sanity checks is an [`ExtractionFailure`] and the metric simply
//! loses that input.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;
use trustlens_domain::{Provenance, SignalResult, SignalType};

/// A signal payload could not be turned into usable evidence
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Extraction failure for {signal_type}: {reason}")]
pub struct ExtractionFailure {
    /// Signal whose payload was rejected
    pub signal_type: SignalType,
    /// Parse or validation error
    pub reason: String,
}

/// A typed payload for one signal type
pub trait Payload: DeserializeOwned {
    /// Signal type this payload is read from
    const SIGNAL: SignalType;

    /// Sanity-check the parsed values
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

fn finite_non_negative(name: &str, v: f64) -> Result<(), String> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be a non-negative number, got {}", name, v))
    }
}

fn percentage(name: &str, v: f64) -> Result<(), String> {
    if v.is_finite() && v > 0.0 && v <= 100.0 {
        Ok(())
    } else {
        Err(format!("{} must be in (0, 100], got {}", name, v))
    }
}

/// Return-to-player rate published by the operator (percent)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DisclosedRate {
    /// Rate in percent, e.g. 96.5
    pub rate: f64,
}

impl Payload for DisclosedRate {
    const SIGNAL: SignalType = SignalType::DisclosedRate;

    fn check(&self) -> Result<(), String> {
        percentage("rate", self.rate)
    }
}

/// Independently observed return-to-player rate (percent)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObservedRate {
    /// Rate in percent
    pub rate: f64,
    /// Number of observed rounds, when reported
    #[serde(default)]
    pub sample_size: Option<u64>,
}

impl Payload for ObservedRate {
    const SIGNAL: SignalType = SignalType::ObservedRate;

    fn check(&self) -> Result<(), String> {
        percentage("rate", self.rate)
    }
}

/// RNG / game certification
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RngCertification {
    /// An accredited lab has certified the games
    pub certified: bool,
    /// The certificate has lapsed
    #[serde(default)]
    pub expired: bool,
    /// Certifying lab
    #[serde(default)]
    pub auditor: Option<String>,
}

impl Payload for RngCertification {
    const SIGNAL: SignalType = SignalType::RngCertification;
}

/// Withdrawal processing times
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PayoutTimes {
    /// Median hours from request to funds received
    pub median_hours: f64,
}

impl Payload for PayoutTimes {
    const SIGNAL: SignalType = SignalType::PayoutTimes;

    fn check(&self) -> Result<(), String> {
        finite_non_negative("median_hours", self.median_hours)
    }
}

/// Complaints over a lookback window
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Complaints {
    /// All complaints in the window
    pub total: u32,
    /// Complaints still open
    pub unresolved: u32,
    /// Complaints about withheld or delayed payouts
    pub payout_related: u32,
    /// Window length in days
    pub lookback_days: u32,
}

impl Complaints {
    /// Payout-related complaints normalised to a 30-day window
    pub fn payout_per_30_days(&self) -> f64 {
        self.payout_related as f64 * 30.0 / self.lookback_days as f64
    }

    /// Percentage of complaints left unresolved (0 when there are none)
    pub fn unresolved_share(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.unresolved as f64 / self.total as f64 * 100.0
        }
    }
}

impl Payload for Complaints {
    const SIGNAL: SignalType = SignalType::Complaints;

    fn check(&self) -> Result<(), String> {
        if self.lookback_days == 0 {
            return Err("lookback_days must be greater than 0".to_string());
        }
        if self.unresolved > self.total || self.payout_related > self.total {
            return Err("complaint breakdown exceeds total".to_string());
        }
        Ok(())
    }
}

/// Customer support responsiveness
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SupportResponse {
    /// Median hours to first response
    pub median_response_hours: f64,
}

impl Payload for SupportResponse {
    const SIGNAL: SignalType = SignalType::SupportResponse;

    fn check(&self) -> Result<(), String> {
        finite_non_negative("median_response_hours", self.median_response_hours)
    }
}

/// Gambling license status
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LicenseStatus {
    /// Holds a license
    pub licensed: bool,
    /// License currently suspended
    #[serde(default)]
    pub suspended: bool,
    /// Regulator strictness tier: 1 (strictest) to 3
    #[serde(default)]
    pub regulator_tier: Option<u8>,
    /// Licensing jurisdiction
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

impl Payload for LicenseStatus {
    const SIGNAL: SignalType = SignalType::LicenseStatus;

    fn check(&self) -> Result<(), String> {
        match self.regulator_tier {
            Some(t) if !(1..=3).contains(&t) => Err(format!("regulator_tier {} not in 1..=3", t)),
            _ => Ok(()),
        }
    }
}

/// Regulatory enforcement in the lookback window
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegulatoryActions {
    /// Fines issued
    pub fines: u32,
    /// Formal warnings issued
    pub warnings: u32,
}

impl RegulatoryActions {
    /// Severity index: a fine counts as three warnings
    pub fn severity(&self) -> f64 {
        self.fines as f64 * 3.0 + self.warnings as f64
    }
}

impl Payload for RegulatoryActions {
    const SIGNAL: SignalType = SignalType::RegulatoryActions;
}

/// Bonus terms and conditions
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BonusTerms {
    /// Wagering requirement as a multiple of the bonus
    pub wagering_multiplier: f64,
    /// Count of restrictive or hidden clauses found
    pub restrictive_clauses: u32,
}

impl Payload for BonusTerms {
    const SIGNAL: SignalType = SignalType::BonusTerms;

    fn check(&self) -> Result<(), String> {
        finite_non_negative("wagering_multiplier", self.wagering_multiplier)
    }
}

/// What a metric sees for one of its inputs
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence<T> {
    /// Live or cached evidence that parsed cleanly
    Present {
        /// Parsed payload
        value: T,
        /// Signal confidence
        confidence: f64,
    },
    /// A fallback stood in for the source
    Fallback {
        /// Penalised fallback confidence
        confidence: f64,
    },
    /// The payload was rejected
    Unparseable(ExtractionFailure),
    /// No signal of this type at all
    Missing,
}

impl<T> Evidence<T> {
    /// Confidence this input contributes to its metric
    pub fn confidence(&self) -> f64 {
        match self {
            Evidence::Present { confidence, .. } | Evidence::Fallback { confidence } => *confidence,
            Evidence::Unparseable(_) | Evidence::Missing => 0.0,
        }
    }

    /// The parsed value, if present
    pub fn value(&self) -> Option<&T> {
        match self {
            Evidence::Present { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// The signals available for one entity in one cycle
///
/// When several sources provide the same signal type, the best one wins:
/// a payload that extracts cleanly over one that does not, then live over
/// cached over fallback, then higher confidence, then lowest source id so
/// the choice is reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSet {
    signals: BTreeMap<SignalType, SignalResult>,
}

fn provenance_rank(p: Provenance) -> u8 {
    match p {
        Provenance::Live => 0,
        Provenance::Cached => 1,
        Provenance::Fallback => 2,
    }
}

fn usable(r: &SignalResult) -> bool {
    r.is_evidence() && check_payload(r.signal_type, &r.payload).is_ok()
}

fn better(candidate: &SignalResult, current: &SignalResult) -> bool {
    let key = |r: &SignalResult| (!usable(r), provenance_rank(r.provenance), r.source_id.clone());
    let (cand_unusable, cand_rank, cand_src) = key(candidate);
    let (cur_unusable, cur_rank, cur_src) = key(current);

    if cand_unusable != cur_unusable {
        return !cand_unusable;
    }
    if cand_rank != cur_rank {
        return cand_rank < cur_rank;
    }
    if candidate.confidence != current.confidence {
        return candidate.confidence > current.confidence;
    }
    cand_src < cur_src
}

impl SignalSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from collected results
    pub fn from_results(results: impl IntoIterator<Item = SignalResult>) -> Self {
        let mut set = Self::new();
        for result in results {
            set.insert(result);
        }
        set
    }

    /// Add a result, keeping the better one on a clash
    pub fn insert(&mut self, result: SignalResult) {
        match self.signals.get(&result.signal_type) {
            Some(current) if !better(&result, current) => {}
            _ => {
                self.signals.insert(result.signal_type, result);
            }
        }
    }

    /// The chosen result for a signal type
    pub fn get(&self, signal_type: SignalType) -> Option<&SignalResult> {
        self.signals.get(&signal_type)
    }

    /// All chosen results, ordered by signal type
    pub fn iter(&self) -> impl Iterator<Item = &SignalResult> {
        self.signals.values()
    }

    /// Number of signal types present
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// True when no signals were collected
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// True when nothing live or cached is present
    pub fn has_no_evidence(&self) -> bool {
        self.signals.values().all(|r| !r.is_evidence())
    }

    /// Typed evidence for payload `T`
    pub fn evidence<T: Payload>(&self) -> Evidence<T> {
        let Some(result) = self.signals.get(&T::SIGNAL) else {
            return Evidence::Missing;
        };

        if result.provenance == Provenance::Fallback {
            return Evidence::Fallback {
                confidence: result.confidence,
            };
        }

        match parse::<T>(&result.payload) {
            Ok(value) => Evidence::Present {
                value,
                confidence: result.confidence,
            },
            Err(reason) => {
                let failure = ExtractionFailure {
                    signal_type: T::SIGNAL,
                    reason,
                };
                warn!(
                    "{} (entity {}, source {})",
                    failure, result.entity_id, result.source_id
                );
                Evidence::Unparseable(failure)
            }
        }
    }

    /// Signal types whose (non-fallback) payload fails extraction
    pub fn extraction_failures(&self) -> Vec<SignalType> {
        self.signals
            .values()
            .filter(|r| r.is_evidence())
            .filter(|r| check_payload(r.signal_type, &r.payload).is_err())
            .map(|r| r.signal_type)
            .collect()
    }
}

fn parse<T: Payload>(payload: &serde_json::Value) -> Result<T, String> {
    let value = T::deserialize(payload).map_err(|e| e.to_string())?;
    value.check()?;
    Ok(value)
}

/// Check that `payload` extracts cleanly as `signal_type`
pub fn check_payload(signal_type: SignalType, payload: &serde_json::Value) -> Result<(), String> {
    match signal_type {
        SignalType::DisclosedRate => parse::<DisclosedRate>(payload).map(|_| ()),
        SignalType::ObservedRate => parse::<ObservedRate>(payload).map(|_| ()),
        SignalType::RngCertification => parse::<RngCertification>(payload).map(|_| ()),
        SignalType::PayoutTimes => parse::<PayoutTimes>(payload).map(|_| ()),
        SignalType::Complaints => parse::<Complaints>(payload).map(|_| ()),
        SignalType::SupportResponse => parse::<SupportResponse>(payload).map(|_| ()),
        SignalType::LicenseStatus => parse::<LicenseStatus>(payload).map(|_| ()),
        SignalType::RegulatoryActions => parse::<RegulatoryActions>(payload).map(|_| ()),
        SignalType::BonusTerms => parse::<BonusTerms>(payload).map(|_| ()),
    }
}
