//! Deterministic mock adapter for tests
//!
//! Scripted payloads, scripted or persistent failures, artificial latency,
//! and counters for calls and peak concurrency. Clones share state, so a
//! test can keep a handle while the collector owns another.

use crate::{SourceAdapter, SourceError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use trustlens_domain::{now_millis, EntityId, SignalResult, SignalType, SourceId};

#[derive(Debug, Default)]
struct Script {
    payloads: HashMap<(EntityId, SignalType), serde_json::Value>,
    failures: HashMap<(EntityId, SignalType), VecDeque<SourceError>>,
    failing_entities: HashMap<EntityId, SourceError>,
    always_fail: Option<SourceError>,
}

/// Mock source adapter
///
/// # Examples
///
/// ```
/// use trustlens_collector::MockAdapter;
/// use trustlens_domain::SignalType;
/// use serde_json::json;
///
/// let adapter = MockAdapter::new("reviews")
///     .with_payload("casino-a", SignalType::PayoutTimes, json!({"median_hours": 12.0}));
/// assert_eq!(adapter.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockAdapter {
    source_id: SourceId,
    confidence: f64,
    delay: Option<Duration>,
    supports_caching: bool,
    force_fallback: bool,
    cost_per_call: f64,
    script: Arc<Mutex<Script>>,
    call_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter even if the fetch is cancelled
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockAdapter {
    /// Create a mock with no scripted payloads
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: SourceId::new(source_id),
            confidence: 0.9,
            delay: None,
            supports_caching: true,
            force_fallback: false,
            cost_per_call: 0.0,
            script: Arc::new(Mutex::new(Script::default())),
            call_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Confidence attached to successful results
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Sleep this long inside every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Opt out of caching
    pub fn without_caching(mut self) -> Self {
        self.supports_caching = false;
        self
    }

    /// Mark the source force-fallback
    pub fn forced_fallback(mut self) -> Self {
        self.force_fallback = true;
        self
    }

    /// Cost reported per call
    pub fn with_cost(mut self, cost_per_call: f64) -> Self {
        self.cost_per_call = cost_per_call;
        self
    }

    /// Script a payload (builder style)
    pub fn with_payload(
        self,
        entity_id: &str,
        signal_type: SignalType,
        payload: serde_json::Value,
    ) -> Self {
        self.set_payload(entity_id, signal_type, payload);
        self
    }

    /// Script or replace a payload
    pub fn set_payload(&self, entity_id: &str, signal_type: SignalType, payload: serde_json::Value) {
        self.script()
            .payloads
            .insert((EntityId::new(entity_id), signal_type), payload);
    }

    /// Queue a failure returned before the scripted payload
    pub fn push_failure(&self, entity_id: &str, signal_type: SignalType, error: SourceError) {
        self.script()
            .failures
            .entry((EntityId::new(entity_id), signal_type))
            .or_default()
            .push_back(error);
    }

    /// Fail every fetch for one entity
    pub fn fail_entity(&self, entity_id: &str, error: SourceError) {
        self.script()
            .failing_entities
            .insert(EntityId::new(entity_id), error);
    }

    /// Fail every fetch, or clear with `None`
    pub fn fail_always(&self, error: Option<SourceError>) {
        self.script().always_fail = error;
    }

    /// Fetches started so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping fetches observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Reset call and concurrency counters
    pub fn reset_counters(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        self.peak_in_flight.store(0, Ordering::SeqCst);
    }

    fn scripted(&self, entity_id: &EntityId, signal_type: SignalType) -> Result<serde_json::Value, SourceError> {
        let mut script = self.script();
        if let Some(error) = &script.always_fail {
            return Err(error.clone());
        }
        if let Some(error) = script.failing_entities.get(entity_id) {
            return Err(error.clone());
        }
        let key = (entity_id.clone(), signal_type);
        if let Some(error) = script.failures.get_mut(&key).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        script.payloads.get(&key).cloned().ok_or_else(|| {
            SourceError::Extraction(format!("no data for {}/{}", entity_id, signal_type))
        })
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    async fn fetch(
        &self,
        entity_id: &EntityId,
        signal_type: SignalType,
        _timeout: Duration,
    ) -> Result<SignalResult, SourceError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let payload = self.scripted(entity_id, signal_type)?;
        Ok(SignalResult::live(
            self.source_id.clone(),
            entity_id.clone(),
            signal_type,
            payload,
            self.confidence,
            now_millis(),
        ))
    }

    fn supports_caching(&self) -> bool {
        self.supports_caching
    }

    fn cost_per_call(&self) -> f64 {
        self.cost_per_call
    }

    fn force_fallback(&self) -> bool {
        self.force_fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_payload() {
        let adapter = MockAdapter::new("reviews").with_payload(
            "casino-a",
            SignalType::PayoutTimes,
            json!({"median_hours": 12.0}),
        );

        let result = adapter
            .fetch(&"casino-a".into(), SignalType::PayoutTimes, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result.payload, json!({"median_hours": 12.0}));
        assert_eq!(result.confidence, 0.9);
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_queued_failures_then_success() {
        let adapter = MockAdapter::new("reviews").with_payload(
            "casino-a",
            SignalType::PayoutTimes,
            json!({"median_hours": 12.0}),
        );
        adapter.push_failure("casino-a", SignalType::PayoutTimes, SourceError::Transient("503".into()));

        let id: EntityId = "casino-a".into();
        let first = adapter.fetch(&id, SignalType::PayoutTimes, Duration::from_secs(1)).await;
        let second = adapter.fetch(&id, SignalType::PayoutTimes, Duration::from_secs(1)).await;

        assert_eq!(first.unwrap_err(), SourceError::Transient("503".into()));
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_unscripted_is_extraction_failure() {
        let adapter = MockAdapter::new("reviews");
        let err = adapter
            .fetch(&"nobody".into(), SignalType::Complaints, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_clones_share_counters() {
        let adapter = MockAdapter::new("reviews");
        let handle = adapter.clone();
        let _ = adapter
            .fetch(&"x".into(), SignalType::Complaints, Duration::from_secs(1))
            .await;
        assert_eq!(handle.call_count(), 1);
    }
}
