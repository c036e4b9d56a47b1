//! Rollup behaviour over a real SQLite store

use std::collections::HashMap;
use std::sync::Arc;
use trustlens_domain::{
    CategoryScore, CompositeScore, CycleId, CycleOutcome, CycleRecord, CycleTrigger, EntityId,
    MetricCategory, ProvenanceSummary, Snapshot, TrustEvent,
};
use trustlens_rollup::{EventBus, EventPublishError, QueryError, Rollup, RollupError};
use trustlens_store::SqliteSnapshotStore;

fn snapshot(entity: &str, cycle: u128, overall: f64) -> Snapshot {
    let score = CompositeScore {
        entity_id: EntityId::new(entity),
        cycle_id: CycleId::from_value(cycle),
        overall,
        category_breakdown: MetricCategory::ALL.map(|category| CategoryScore {
            category,
            score: overall,
            confidence: 0.9,
            weight: 0.2,
        }),
        confidence: 0.9,
        rationale: Vec::new(),
        provenance_summary: ProvenanceSummary::default(),
        metrics: Vec::new(),
    };
    Snapshot::new(score, 1_000 + cycle as u64)
}

fn rollup() -> Rollup<SqliteSnapshotStore> {
    Rollup::open(SqliteSnapshotStore::in_memory().unwrap(), EventBus::default()).unwrap()
}

#[test]
fn test_unanalyzed_entity_is_reported_not_fabricated() {
    let rollup = rollup();
    let entity = EntityId::new("casino-new");

    assert_eq!(
        rollup.latest_score(&entity),
        Err(QueryError::NotYetAnalyzed(entity.clone()))
    );
    assert_eq!(
        rollup.score_at_cycle(&entity, CycleId::from_value(1)),
        Err(QueryError::NotYetAnalyzed(entity.clone()))
    );
    assert_eq!(
        rollup.history(&entity, 10),
        Err(QueryError::NotYetAnalyzed(entity))
    );
}

#[tokio::test]
async fn test_event_published_after_commit_and_pull_agrees() {
    let rollup = rollup();
    let mut sub = rollup.subscribe(None);

    let receipt = rollup
        .commit_and_publish(snapshot("casino-a", 10, 82.5), CycleTrigger::Manual)
        .unwrap();
    assert_eq!(receipt.delivery, Ok(1));

    let update = sub.recv_update().await.unwrap();
    assert_eq!(update.cycle_id, CycleId::from_value(10));
    assert_eq!(update.overall, 82.5);
    assert_eq!(update.category_breakdown.len(), 5);

    let pulled = rollup.latest_score(&update.entity_id).unwrap();
    assert_eq!(pulled.cycle_id, update.cycle_id);
    assert_eq!(pulled.overall, update.overall);
    assert_eq!(
        rollup.score_at_cycle(&update.entity_id, update.cycle_id).unwrap(),
        pulled
    );
}

#[test]
fn test_commit_without_subscribers_still_succeeds() {
    let rollup = rollup();
    let receipt = rollup
        .commit_and_publish(snapshot("casino-a", 1, 70.0), CycleTrigger::Scheduled)
        .unwrap();

    assert_eq!(
        receipt.delivery,
        Err(EventPublishError::NoSubscribers("entity.trust.updated"))
    );
    assert_eq!(rollup.latest_score(&"casino-a".into()).unwrap().overall, 70.0);
}

#[test]
fn test_older_cycle_rejected_before_write() {
    let rollup = rollup();
    rollup
        .commit_and_publish(snapshot("casino-a", 20, 70.0), CycleTrigger::Scheduled)
        .unwrap();

    let result = rollup.commit_and_publish(snapshot("casino-a", 10, 10.0), CycleTrigger::Manual);
    assert!(matches!(result, Err(RollupError::OutOfOrder { .. })));

    assert_eq!(
        rollup.score_at_cycle(&"casino-a".into(), CycleId::from_value(10)),
        Err(QueryError::CycleNotFound {
            entity_id: "casino-a".into(),
            cycle_id: CycleId::from_value(10),
        })
    );
}

#[test]
fn test_duplicate_commit_is_a_snapshot_write_error() {
    let rollup = rollup();
    rollup
        .commit_and_publish(snapshot("casino-a", 5, 70.0), CycleTrigger::Scheduled)
        .unwrap();

    let result = rollup.commit_and_publish(snapshot("casino-a", 5, 71.0), CycleTrigger::Manual);
    assert!(matches!(result, Err(RollupError::SnapshotWrite { .. })));
    assert_eq!(rollup.latest_score(&"casino-a".into()).unwrap().overall, 70.0);
}

#[test]
fn test_rehydrates_from_store_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trustlens.db");

    {
        let rollup = Rollup::open(SqliteSnapshotStore::new(&path).unwrap(), EventBus::default())
            .unwrap();
        rollup
            .commit_and_publish(snapshot("casino-a", 1, 60.0), CycleTrigger::Scheduled)
            .unwrap();
        rollup
            .commit_and_publish(snapshot("casino-a", 2, 65.0), CycleTrigger::Scheduled)
            .unwrap();
        rollup
            .commit_and_publish(snapshot("casino-b", 2, 90.0), CycleTrigger::Scheduled)
            .unwrap();
    }

    let restarted =
        Rollup::open(SqliteSnapshotStore::new(&path).unwrap(), EventBus::default()).unwrap();
    assert_eq!(restarted.analyzed_count(), 2);
    assert_eq!(
        restarted.latest_score(&"casino-a".into()).unwrap().cycle_id,
        CycleId::from_value(2)
    );
    let history = restarted.history(&"casino-a".into(), 10).unwrap();
    assert_eq!(history.len(), 2);

    // Ordering guard survives the restart
    let stale = restarted.commit_and_publish(snapshot("casino-a", 1, 1.0), CycleTrigger::Manual);
    assert!(matches!(stale, Err(RollupError::OutOfOrder { .. })));
}

#[tokio::test]
async fn test_reconnecting_subscriber_reconciles_by_pull() {
    let rollup = rollup();

    let first = rollup.subscribe(Some("casino-a".into()));
    rollup
        .commit_and_publish(snapshot("casino-a", 1, 60.0), CycleTrigger::Scheduled)
        .unwrap();
    drop(first);

    // Published while nobody was listening
    rollup
        .commit_and_publish(snapshot("casino-a", 2, 75.0), CycleTrigger::Scheduled)
        .unwrap();

    let mut reconnected = rollup.subscribe(Some("casino-a".into()));
    assert!(reconnected.drain().is_empty());

    let latest = rollup.latest_score(&"casino-a".into()).unwrap();
    assert_eq!(latest.cycle_id, CycleId::from_value(2));
    assert_eq!(latest.overall, 75.0);
}

#[test]
fn test_skip_recorded_and_announced_without_touching_latest() {
    let rollup = rollup();
    rollup
        .commit_and_publish(snapshot("casino-a", 1, 60.0), CycleTrigger::Scheduled)
        .unwrap();
    let mut sub = rollup.subscribe(None);

    rollup
        .record_outcome(CycleRecord {
            cycle_id: CycleId::from_value(2),
            entity_id: "casino-a".into(),
            trigger: CycleTrigger::Scheduled,
            outcome: CycleOutcome::Skipped {
                reason: "no live or cached evidence".to_string(),
            },
            recorded_at: 2,
        })
        .unwrap();

    let events = sub.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], TrustEvent::CycleSkipped(_)));

    assert_eq!(
        rollup.latest_score(&"casino-a".into()).unwrap().cycle_id,
        CycleId::from_value(1)
    );
    let records = rollup.cycle_records(CycleId::from_value(2)).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome.as_str(), "skipped");
}

#[test]
fn test_concurrent_commits_keep_per_entity_order() {
    let rollup = Arc::new(rollup());
    let mut sub = rollup.subscribe(None);

    let handles: Vec<_> = ["casino-a", "casino-b", "casino-c"]
        .into_iter()
        .map(|entity| {
            let rollup = Arc::clone(&rollup);
            std::thread::spawn(move || {
                for cycle in 1..=20 {
                    rollup
                        .commit_and_publish(snapshot(entity, cycle, 50.0), CycleTrigger::Scheduled)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut last_seen: HashMap<EntityId, CycleId> = HashMap::new();
    let events = sub.drain();
    assert_eq!(events.len(), 60);
    for event in events {
        if let TrustEvent::TrustUpdated(update) = event {
            if let Some(previous) = last_seen.get(&update.entity_id) {
                assert!(update.cycle_id >= *previous);
            }
            last_seen.insert(update.entity_id, update.cycle_id);
        }
    }
}

#[test]
fn test_rollup_owns_its_store_and_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Rollup<SqliteSnapshotStore>>();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trustlens.db");
    {
        let rollup = Rollup::open(SqliteSnapshotStore::new(&path).unwrap(), EventBus::default()).unwrap();
        rollup
            .commit_and_publish(snapshot("casino-a", 1, 70.0), CycleTrigger::Scheduled)
            .unwrap();
    }

    // Dropping the rollup closes the store, so a second open sees the commit
    let reopened = Rollup::open(SqliteSnapshotStore::new(&path).unwrap(), EventBus::default()).unwrap();
    assert_eq!(reopened.analyzed_count(), 1);
}
