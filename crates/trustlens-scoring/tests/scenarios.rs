//! End-to-end scoring scenarios: signals in, composite score out

use proptest::prelude::*;
use serde_json::{json, Value};
use trustlens_domain::{
    CompositeScore, CycleId, EntityId, MetricCategory, MetricKind, ProvenanceSummary,
    SignalResult, SignalType, SourceId,
};
use trustlens_scoring::{CompositeScorer, MetricEngine, ScoringConfig, SignalSet};

fn signal(signal_type: SignalType, payload: Value, confidence: f64) -> SignalResult {
    SignalResult::live(
        SourceId::new("reviews"),
        EntityId::new("casino-a"),
        signal_type,
        payload,
        confidence,
        1_000,
    )
}

fn healthy_signals(observed_rate: f64, confidence: f64) -> SignalSet {
    SignalSet::from_results([
        signal(SignalType::DisclosedRate, json!({"rate": 96.0}), confidence),
        signal(
            SignalType::ObservedRate,
            json!({"rate": observed_rate, "sample_size": 250_000}),
            confidence,
        ),
        signal(
            SignalType::RngCertification,
            json!({"certified": true, "auditor": "eCOGRA"}),
            confidence,
        ),
        signal(SignalType::PayoutTimes, json!({"median_hours": 20.0}), confidence),
        signal(
            SignalType::Complaints,
            json!({"total": 0, "unresolved": 0, "payout_related": 0, "lookback_days": 90}),
            confidence,
        ),
        signal(
            SignalType::SupportResponse,
            json!({"median_response_hours": 1.0}),
            confidence,
        ),
        signal(
            SignalType::LicenseStatus,
            json!({"licensed": true, "regulator_tier": 1, "jurisdiction": "MT"}),
            confidence,
        ),
        signal(
            SignalType::RegulatoryActions,
            json!({"fines": 0, "warnings": 0}),
            confidence,
        ),
        signal(
            SignalType::BonusTerms,
            json!({"wagering_multiplier": 10.0, "restrictive_clauses": 0}),
            confidence,
        ),
    ])
}

fn score(signals: &SignalSet) -> CompositeScore {
    let config = ScoringConfig::default();
    let engine = MetricEngine::new(&config).unwrap();
    let scorer = CompositeScorer::new(&config).unwrap();

    let report = engine.evaluate(signals, 2_000);
    let mut provenance = ProvenanceSummary::default();
    for result in signals.iter() {
        provenance.record(result.provenance);
    }
    scorer.score(
        EntityId::new("casino-a"),
        CycleId::from_value(42),
        &report,
        provenance,
    )
}

#[test]
fn test_healthy_entity_scores_high() {
    let score = score(&healthy_signals(95.8, 0.95));

    assert!(score.overall >= 90.0, "overall {}", score.overall);
    assert!(!score.is_low_confidence());
    assert_eq!(score.provenance_summary.live, 9);
    assert_eq!(score.provenance_summary.missing, 0);

    for kind in [
        MetricKind::RtpAccuracy,
        MetricKind::RngCertification,
        MetricKind::PayoutSpeed,
        MetricKind::PayoutComplaints,
    ] {
        let metric = score.metric(kind).unwrap();
        assert!(metric.value >= 95.0, "{} = {}", kind, metric.value);
    }
}

#[test]
fn test_rtp_deviation_moves_only_fairness() {
    let baseline = score(&healthy_signals(95.8, 0.95));
    let deviated = score(&healthy_signals(96.0 * 0.92, 0.95));

    assert!(deviated.metric(MetricKind::RtpAccuracy).unwrap().value < 60.0);

    let drop = baseline.overall - deviated.overall;
    let fairness_weight = ScoringConfig::default().category_weights.fairness;
    assert!(drop > 0.0);
    assert!(drop <= fairness_weight * 100.0 + 0.01, "drop {}", drop);

    for category in MetricCategory::ALL {
        if category != MetricCategory::Fairness {
            assert_eq!(
                baseline.category(category).score,
                deviated.category(category).score,
                "{} changed",
                category
            );
        }
    }

    assert_eq!(deviated.rationale[0].metric, MetricKind::RtpAccuracy);
}

#[test]
fn test_breakdown_always_has_five_categories() {
    assert_eq!(score(&SignalSet::new()).category_breakdown.len(), 5);
    assert_eq!(score(&healthy_signals(95.8, 0.95)).category_breakdown.len(), 5);
}

#[test]
fn test_missing_evidence_shrinks_toward_neutral() {
    let score = score(&SignalSet::new());
    assert_eq!(score.confidence, 0.0);
    assert!(score.is_low_confidence());
    assert_eq!(score.provenance_summary.missing, 11);
}

proptest! {
    #[test]
    fn prop_scoring_is_deterministic(observed in 0.0f64..100.0, confidence in 0.0f64..=1.0) {
        let signals = healthy_signals(observed, confidence);
        prop_assert_eq!(score(&signals), score(&signals));
    }

    #[test]
    fn prop_overall_in_bounds(
        observed in 0.0f64..100.0,
        payout_hours in 0.0f64..2_000.0,
        wagering in 0.0f64..500.0,
        confidence in 0.0f64..=1.0,
    ) {
        let mut signals = healthy_signals(observed, confidence);
        signals.insert(signal(SignalType::PayoutTimes, json!({"median_hours": payout_hours}), 1.0));
        signals.insert(signal(
            SignalType::BonusTerms,
            json!({"wagering_multiplier": wagering, "restrictive_clauses": 4}),
            1.0,
        ));

        let score = score(&signals);
        prop_assert!((0.0..=100.0).contains(&score.overall));
        prop_assert!((0.0..=1.0).contains(&score.confidence));
        for category in &score.category_breakdown {
            prop_assert!((0.0..=100.0).contains(&category.score));
        }
    }
}
