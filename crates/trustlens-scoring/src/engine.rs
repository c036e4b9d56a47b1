//! Metric engine: signals → metrics
//!
//! Each metric is a pure function of the signals available for one entity
//! in one cycle. Absence of evidence is never punished: a metric whose
//! inputs are missing, unparseable or fallbacks reports its neutral default
//! with confidence reduced in proportion to the inputs it lost.

use crate::evidence::{
    BonusTerms, Complaints, DisclosedRate, Evidence, LicenseStatus, ObservedRate, Payload,
    PayoutTimes, RegulatoryActions, RngCertification, SignalSet, SupportResponse,
};
use crate::{MetricPolicy, PenaltyCurve, ScoringConfig, ScoringConfigError};
use trustlens_domain::confidence;
use trustlens_domain::{Metric, MetricKind, SignalType};

/// Metrics for one entity plus bookkeeping about their inputs
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReport {
    /// One metric per [`MetricKind`], in declaration order
    pub metrics: Vec<Metric>,
    /// Metric inputs with no signal at all
    pub missing_inputs: u32,
    /// Signal types whose payload was rejected
    pub extraction_failures: Vec<SignalType>,
}

/// Computes the fixed metric set from a [`SignalSet`]
#[derive(Debug, Clone)]
pub struct MetricEngine {
    policies: Vec<MetricPolicy>,
    min_sample_size: u64,
}

/// Intermediate result of a metric function
struct Outcome {
    value: Option<f64>,
    confidence: f64,
    contributing: Vec<SignalType>,
}

impl Outcome {
    fn neutral(confidence: f64, contributing: Vec<SignalType>) -> Self {
        Self {
            value: None,
            confidence,
            contributing,
        }
    }
}

impl MetricEngine {
    /// Create an engine from a scoring policy
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringConfigError> {
        config.validate()?;
        Ok(Self {
            policies: config.ordered_policies(),
            min_sample_size: config.min_sample_size,
        })
    }

    /// Evaluate every metric for one entity
    pub fn evaluate(&self, signals: &SignalSet, computed_at: u64) -> MetricReport {
        let metrics = self
            .policies
            .iter()
            .map(|policy| self.evaluate_one(policy, signals, computed_at))
            .collect();

        let missing_inputs = MetricKind::ALL
            .iter()
            .flat_map(|m| m.inputs())
            .filter(|t| signals.get(**t).is_none())
            .count() as u32;

        MetricReport {
            metrics,
            missing_inputs,
            extraction_failures: signals.extraction_failures(),
        }
    }

    fn evaluate_one(&self, policy: &MetricPolicy, signals: &SignalSet, computed_at: u64) -> Metric {
        let kind = policy.metric;
        let curve = policy.curve.as_ref();

        let outcome = match kind {
            MetricKind::RtpAccuracy => self.rtp_accuracy(signals, curve),
            MetricKind::RngCertification => {
                single::<RngCertification>(signals, |c| Some(rng_certification_score(c)))
            }
            MetricKind::PayoutSpeed => {
                single::<PayoutTimes>(signals, |p| curve.map(|c| c.score(p.median_hours)))
            }
            MetricKind::PayoutComplaints => {
                single::<Complaints>(signals, |c| curve.map(|k| k.score(c.payout_per_30_days())))
            }
            MetricKind::SupportResponsiveness => single::<SupportResponse>(signals, |s| {
                curve.map(|c| c.score(s.median_response_hours))
            }),
            MetricKind::ComplaintResolution => single::<Complaints>(signals, |c| {
                if c.total == 0 {
                    Some(100.0)
                } else {
                    curve.map(|k| k.score(c.unresolved_share()))
                }
            }),
            MetricKind::LicenseStanding => {
                single::<LicenseStatus>(signals, |l| Some(license_score(l)))
            }
            MetricKind::RegulatoryHistory => {
                single::<RegulatoryActions>(signals, |r| curve.map(|c| c.score(r.severity())))
            }
            MetricKind::WageringFairness => {
                single::<BonusTerms>(signals, |b| curve.map(|c| c.score(b.wagering_multiplier)))
            }
            MetricKind::TermClarity => single::<BonusTerms>(signals, |b| {
                curve.map(|c| c.score(b.restrictive_clauses as f64))
            }),
        };

        let neutral = outcome.value.is_none();
        Metric {
            name: kind,
            category: kind.category(),
            value: outcome.value.unwrap_or(policy.neutral).clamp(0.0, 100.0),
            confidence: confidence::clamp(outcome.confidence),
            contributing_signals: outcome.contributing,
            neutral,
            computed_at,
        }
    }

    /// Disclosed vs observed RTP, through the deviation curve
    fn rtp_accuracy(&self, signals: &SignalSet, curve: Option<&PenaltyCurve>) -> Outcome {
        let disclosed = signals.evidence::<DisclosedRate>();
        let observed = signals.evidence::<ObservedRate>();

        let mut contributing = Vec::new();
        if disclosed.value().is_some() {
            contributing.push(SignalType::DisclosedRate);
        }
        if observed.value().is_some() {
            contributing.push(SignalType::ObservedRate);
        }

        let (Some(d), Some(o), Some(curve)) = (disclosed.value(), observed.value(), curve) else {
            let confidence = (disclosed.confidence() + observed.confidence()) / 2.0;
            return Outcome::neutral(confidence, contributing);
        };

        let deviation_pct = (o.rate - d.rate).abs() / d.rate * 100.0;
        let sample_factor = match o.sample_size {
            Some(n) => (n as f64 / self.min_sample_size as f64).min(1.0),
            None => 1.0,
        };

        Outcome {
            value: Some(curve.score(deviation_pct)),
            confidence: (disclosed.confidence() + observed.confidence()) / 2.0 * sample_factor,
            contributing,
        }
    }
}

/// Run a single-input metric; `score` returning `None` falls back to neutral
fn single<T: Payload>(signals: &SignalSet, score: impl Fn(&T) -> Option<f64>) -> Outcome {
    match signals.evidence::<T>() {
        Evidence::Present { value, confidence } => match score(&value) {
            Some(v) => Outcome {
                value: Some(v),
                confidence,
                contributing: vec![T::SIGNAL],
            },
            None => Outcome::neutral(confidence, vec![T::SIGNAL]),
        },
        other => Outcome::neutral(other.confidence(), Vec::new()),
    }
}

fn rng_certification_score(cert: &RngCertification) -> f64 {
    match (cert.certified, cert.expired) {
        (true, false) => 100.0,
        (true, true) => 60.0,
        (false, _) => 20.0,
    }
}

fn license_score(license: &LicenseStatus) -> f64 {
    if license.suspended {
        return 0.0;
    }
    if !license.licensed {
        return 10.0;
    }
    match license.regulator_tier {
        Some(1) => 100.0,
        Some(2) => 85.0,
        _ => 65.0,
    }
}
