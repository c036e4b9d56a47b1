//! TrustLens Scoring
//!
//! Turns the signals collected for one entity in one cycle into metrics, and
//! metrics into a single explainable composite score.
//!
//! Everything in this crate is synchronous and pure: the same signals and
//! the same [`ScoringConfig`] always produce the same [`CompositeScore`].
//!
//! # Pipeline
//!
//! ```text
//! SignalSet ──MetricEngine::evaluate──▶ MetricReport ──CompositeScorer::score──▶ CompositeScore
//! ```
//!
//! # Policy
//!
//! Weights, neutral defaults and penalty curves are explicit configuration
//! (see [`ScoringConfig`]); nothing numeric is hidden inside the metric
//! functions.
//!
//! [`CompositeScore`]: trustlens_domain::CompositeScore

#![warn(missing_docs)]

mod composite;
mod config;
mod curve;
mod engine;
mod error;
mod evidence;

pub use composite::CompositeScorer;
pub use config::{CategoryWeights, MetricPolicy, ScoringConfig};
pub use curve::PenaltyCurve;
pub use engine::{MetricEngine, MetricReport};
pub use error::ScoringConfigError;
pub use evidence::{
    check_payload, BonusTerms, Complaints, DisclosedRate, Evidence, ExtractionFailure, LicenseStatus,
    ObservedRate, Payload, PayoutTimes, RegulatoryActions, RngCertification, SignalSet,
    SupportResponse,
};
