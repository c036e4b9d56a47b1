//! Persisted-form tests for snapshots and events

use trustlens_domain::{
    CategoryScore, CompositeScore, CycleId, EntityId, Metric, MetricCategory, MetricKind,
    ProvenanceSummary, RationaleEntry, SignalType, Snapshot, SourceId, TrustEvent, UpdateEvent,
    SCHEMA_VERSION,
};

fn sample_score() -> CompositeScore {
    let category_breakdown = MetricCategory::ALL.map(|category| CategoryScore {
        category,
        score: 71.0 + category.index() as f64 * 3.3,
        confidence: 0.81,
        weight: 0.2,
    });

    CompositeScore {
        entity_id: EntityId::new("casino-a"),
        cycle_id: CycleId::from_value(0x0190_0000_0000_7000_8000_0000_0000_0001),
        overall: 77.13,
        category_breakdown,
        confidence: 0.8123456789,
        rationale: vec![RationaleEntry {
            metric: MetricKind::PayoutSpeed,
            category: MetricCategory::PayoutReliability,
            value: 40.0,
            magnitude: 7.5,
        }],
        provenance_summary: ProvenanceSummary {
            live: 7,
            cached: 1,
            fallback: 1,
            missing: 0,
            extraction_failures: 1,
            degraded_sources: vec![SourceId::new("license-registry")],
            low_confidence: false,
        },
        metrics: vec![Metric {
            name: MetricKind::PayoutSpeed,
            category: MetricCategory::PayoutReliability,
            value: 40.0,
            confidence: 0.9,
            contributing_signals: vec![SignalType::PayoutTimes],
            neutral: false,
            computed_at: 1_700_000_000_000,
        }],
    }
}

#[test]
fn test_snapshot_json_roundtrip_preserves_score() {
    let snapshot = Snapshot::new(sample_score(), 1_700_000_000_500);
    assert_eq!(snapshot.schema_version, SCHEMA_VERSION);

    let json = serde_json::to_string(&snapshot).unwrap();
    let back: Snapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(back, snapshot);
    assert_eq!(back.composite_score.overall, snapshot.composite_score.overall);
    assert_eq!(
        back.composite_score.category_breakdown,
        snapshot.composite_score.category_breakdown
    );
    assert_eq!(
        back.composite_score.provenance_summary,
        snapshot.composite_score.provenance_summary
    );
}

#[test]
fn test_snapshot_has_explicit_schema_version() {
    let snapshot = Snapshot::new(sample_score(), 1);
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["composite_score"]["category_breakdown"].as_array().unwrap().len(), 5);
}

#[test]
fn test_update_event_wire_shape() {
    let snapshot = Snapshot::new(sample_score(), 10);
    let event = TrustEvent::TrustUpdated(UpdateEvent::from_snapshot(&snapshot, 11));

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "entity.trust.updated");
    assert_eq!(value["entity_id"], "casino-a");
    assert_eq!(value["overall"], 77.13);
    assert_eq!(value["category_breakdown"].as_array().unwrap().len(), 5);
    assert_eq!(value["published_at"], 11);
    assert!(value.get("provenance_summary").is_some());
}
