//! Signal cache
//!
//! Content-addressed, TTL-bounded store of the last good fetch per
//! (entity, source, signal type). Entries are replaced, never mutated.
//! Confidence of a served entry decays with age so an older value never
//! outranks a fresher one.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use trustlens_domain::{confidence, EntityId, Provenance, SignalResult, SignalType, SourceId};
use tracing::debug;

/// Cache key: hex SHA-256 of `entity \0 source \0 signal_type`
pub fn cache_key(entity_id: &EntityId, source_id: &SourceId, signal_type: SignalType) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entity_id.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(source_id.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(signal_type.as_str().as_bytes());

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// TTL cache of live signal results
#[derive(Debug)]
pub struct SignalCache {
    entries: Mutex<HashMap<String, SignalResult>>,
    ttl_ms: u64,
}

impl SignalCache {
    /// Create an empty cache
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, SignalResult>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a live result, superseding any previous entry for its key
    pub fn put(&self, result: &SignalResult) {
        if result.provenance != Provenance::Live {
            return;
        }
        let key = cache_key(&result.entity_id, &result.source_id, result.signal_type);
        self.entries().insert(key, result.clone());
    }

    /// Serve a cached result as of `now` (ms)
    ///
    /// The returned copy is tagged [`Provenance::Cached`] and its confidence
    /// decayed with a half-life equal to the TTL. Entries at or past the TTL
    /// are never served.
    pub fn get(
        &self,
        entity_id: &EntityId,
        source_id: &SourceId,
        signal_type: SignalType,
        now: u64,
    ) -> Option<SignalResult> {
        let key = cache_key(entity_id, source_id, signal_type);
        let entries = self.entries();
        let entry = entries.get(&key)?;

        let age = entry.age_ms(now);
        if age >= self.ttl_ms {
            debug!(
                "Cache entry for {}/{}/{} expired ({} ms old)",
                entity_id, source_id, signal_type, age
            );
            return None;
        }

        let mut served = entry.clone();
        served.confidence = confidence::decayed(entry.confidence, age, self.ttl_ms);
        served.provenance = Provenance::Cached;
        Some(served)
    }

    /// Drop entries at or past the TTL; returns how many were removed
    pub fn purge_expired(&self, now: u64) -> usize {
        let ttl = self.ttl_ms;
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.age_ms(now) < ttl);
        before - entries.len()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const DAY_MS: u64 = 86_400_000;

    fn live(at: u64, confidence: f64) -> SignalResult {
        SignalResult::live(
            SourceId::new("reviews"),
            EntityId::new("casino-a"),
            SignalType::Complaints,
            json!({"total": 1}),
            confidence,
            at,
        )
    }

    fn cache() -> SignalCache {
        SignalCache::new(Duration::from_millis(DAY_MS))
    }

    fn lookup(cache: &SignalCache, now: u64) -> Option<SignalResult> {
        cache.get(
            &EntityId::new("casino-a"),
            &SourceId::new("reviews"),
            SignalType::Complaints,
            now,
        )
    }

    #[test]
    fn test_key_is_stable_hex() {
        let a = cache_key(&"e".into(), &"s".into(), SignalType::Complaints);
        let b = cache_key(&"e".into(), &"s".into(), SignalType::Complaints);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_separator_prevents_collisions() {
        let a = cache_key(&"ab".into(), &"c".into(), SignalType::Complaints);
        let b = cache_key(&"a".into(), &"bc".into(), SignalType::Complaints);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fresh_hit_is_tagged_cached() {
        let cache = cache();
        cache.put(&live(1_000, 0.8));

        let hit = lookup(&cache, 1_000).unwrap();
        assert_eq!(hit.provenance, Provenance::Cached);
        assert_eq!(hit.confidence, 0.8);
    }

    #[test]
    fn test_confidence_decays_with_age() {
        let cache = cache();
        cache.put(&live(0, 0.8));

        let hit = lookup(&cache, DAY_MS / 2).unwrap();
        assert!((hit.confidence - 0.8 * 0.5f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_expired_entry_not_served() {
        let cache = cache();
        cache.put(&live(0, 0.8));

        assert!(lookup(&cache, DAY_MS - 1).is_some());
        assert!(lookup(&cache, DAY_MS).is_none());
    }

    #[test]
    fn test_newer_fetch_supersedes() {
        let cache = cache();
        cache.put(&live(0, 0.4));
        cache.put(&live(500, 0.9));

        assert_eq!(cache.len(), 1);
        assert_eq!(lookup(&cache, 500).unwrap().fetched_at, 500);
    }

    #[test]
    fn test_fallbacks_are_not_cached() {
        let cache = cache();
        cache.put(&SignalResult::fallback(
            SourceId::new("reviews"),
            EntityId::new("casino-a"),
            SignalType::Complaints,
            0.2,
            0,
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = cache();
        cache.put(&live(0, 0.8));
        assert_eq!(cache.purge_expired(DAY_MS - 1), 0);
        assert_eq!(cache.purge_expired(DAY_MS), 1);
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn prop_older_entries_never_more_confident(
            confidence in 0.0f64..=1.0,
            fresh_age in 0u64..DAY_MS,
            extra in 0u64..DAY_MS,
        ) {
            let cache = cache();
            cache.put(&live(0, confidence));

            let fresher = lookup(&cache, fresh_age).map(|r| r.confidence).unwrap_or(0.0);
            let older = lookup(&cache, fresh_age + extra).map(|r| r.confidence).unwrap_or(0.0);
            prop_assert!(older <= fresher);
        }
    }
}
