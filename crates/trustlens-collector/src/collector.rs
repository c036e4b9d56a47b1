//! Signal collector
//!
//! Runs one cycle's fetches across every tracked entity and bound source:
//!
//! - a global concurrency limit shared by all entities in the cycle
//! - a per-fetch timeout and retry with exponential backoff for timeouts and
//!   transient failures
//! - one in-flight fetch per (entity, source, signal type); duplicates await
//!   the first
//! - cache-or-fallback when a source cannot deliver, with auth and config
//!   failures flagging the source degraded
//!
//! A failing source never fails the cycle; every requested signal ends up
//! live, cached or fallback.

use crate::cache::{cache_key, SignalCache};
use crate::flight::SingleFlight;
use crate::{CollectorConfig, SourceAdapter, SourceError};
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use trustlens_domain::{
    now_millis, EntityId, Provenance, ProvenanceSummary, SignalResult, SignalType, SourceId,
    TrackedEntity,
};
use trustlens_scoring::{check_payload, SignalSet};

/// Signals gathered for one entity in one cycle
#[derive(Debug, Clone, Default)]
pub struct EntitySignals {
    /// Best result per signal type
    pub signals: SignalSet,
    /// Live/cached/fallback counts and degraded sources for this entity
    pub provenance: ProvenanceSummary,
}

impl EntitySignals {
    /// True when nothing live or cached was collected
    pub fn has_no_evidence(&self) -> bool {
        self.signals.has_no_evidence()
    }
}

/// Counters for one collection pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStats {
    /// Signals requested (entity × binding × signal type)
    pub requested: u32,
    /// Adapter calls actually made, retries included
    pub adapter_calls: u32,
    /// Sum of `cost_per_call` over those calls
    pub estimated_cost: f64,
}

/// Output of [`SignalCollector::collect`]
#[derive(Debug, Clone, Default)]
pub struct CycleSignals {
    /// Signals per entity; every requested entity has an entry
    pub entities: HashMap<EntityId, EntitySignals>,
    /// Sources flagged degraded this cycle, with the first failure seen
    pub degraded_sources: BTreeMap<SourceId, String>,
    /// Call accounting
    pub stats: CollectionStats,
}

impl CycleSignals {
    /// Signals for one entity
    pub fn entity(&self, entity_id: &EntityId) -> Option<&EntitySignals> {
        self.entities.get(entity_id)
    }
}

/// Result of obtaining one signal, shared between collapsed callers
#[derive(Debug, Clone)]
struct Fetched {
    result: SignalResult,
    degraded: Option<String>,
}

/// Per-cycle shared state
struct CycleContext {
    limiter: Semaphore,
    flight: SingleFlight<Fetched>,
    calls: Mutex<HashMap<SourceId, u32>>,
}

impl CycleContext {
    fn count_call(&self, source_id: &SourceId) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        *calls.entry(source_id.clone()).or_insert(0) += 1;
    }
}

/// Collects signals for a cycle through registered source adapters
pub struct SignalCollector {
    adapters: HashMap<SourceId, Arc<dyn SourceAdapter>>,
    cache: SignalCache,
    config: CollectorConfig,
}

impl SignalCollector {
    /// Create a collector with no adapters
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            adapters: HashMap::new(),
            cache: SignalCache::new(config.cache_ttl()),
            config,
        }
    }

    /// Register an adapter (builder style)
    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Register an adapter, replacing any previous one for the same source
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        let source_id = adapter.source_id().clone();
        debug!(
            "Registered source {} (caching: {}, forced fallback: {})",
            source_id,
            adapter.supports_caching(),
            adapter.force_fallback()
        );
        self.adapters.insert(source_id, adapter);
    }

    /// Registered source ids, sorted
    pub fn sources(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.adapters.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The signal cache (shared across cycles)
    pub fn cache(&self) -> &SignalCache {
        &self.cache
    }

    /// Active configuration
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect every bound signal for `entities`
    ///
    /// Never fails: each signal resolves to live, cached or fallback.
    pub async fn collect(&self, entities: &[TrackedEntity]) -> CycleSignals {
        let purged = self.cache.purge_expired(now_millis());
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }

        let requests: Vec<(&EntityId, &SourceId, SignalType)> = entities
            .iter()
            .flat_map(|entity| {
                entity.bindings.iter().flat_map(move |binding| {
                    binding
                        .signals
                        .iter()
                        .map(move |signal_type| (&entity.id, &binding.source, *signal_type))
                })
            })
            .collect();

        info!(
            "Collecting {} signals for {} entities (concurrency {})",
            requests.len(),
            entities.len(),
            self.config.max_concurrency
        );

        let ctx = CycleContext {
            limiter: Semaphore::new(self.config.max_concurrency),
            flight: SingleFlight::new(),
            calls: Mutex::new(HashMap::new()),
        };

        let ctx = &ctx;
        let fetched = join_all(requests.iter().map(move |&(entity_id, source_id, signal_type)| {
            ctx.flight.run(
                cache_key(entity_id, source_id, signal_type),
                move || self.obtain(entity_id, source_id, signal_type, ctx),
            )
        }))
        .await;

        let mut out = CycleSignals::default();
        for entity in entities {
            out.entities.entry(entity.id.clone()).or_default();
        }

        // Collapsed duplicates share one result and are tallied once
        let mut seen = HashSet::new();
        for (&(entity_id, source_id, signal_type), fetched) in requests.iter().zip(fetched) {
            if !seen.insert((entity_id, source_id, signal_type)) {
                continue;
            }
            let slot = out.entities.entry(entity_id.clone()).or_default();
            slot.provenance.record(fetched.result.provenance);

            if let Some(reason) = fetched.degraded {
                if !slot.provenance.degraded_sources.contains(source_id) {
                    slot.provenance.degraded_sources.push(source_id.clone());
                }
                out.degraded_sources
                    .entry(source_id.clone())
                    .or_insert(reason);
            }

            slot.signals.insert(fetched.result);
        }

        let calls = ctx.calls.lock().unwrap_or_else(PoisonError::into_inner).clone();
        out.stats = CollectionStats {
            requested: requests.len() as u32,
            adapter_calls: calls.values().sum(),
            estimated_cost: calls
                .iter()
                .map(|(source_id, n)| {
                    let cost = self.adapters.get(source_id).map(|a| a.cost_per_call());
                    cost.unwrap_or(0.0) * *n as f64
                })
                .sum(),
        };

        let summary = out.entities.values().fold(ProvenanceSummary::default(), |mut acc, e| {
            acc.live += e.provenance.live;
            acc.cached += e.provenance.cached;
            acc.fallback += e.provenance.fallback;
            acc
        });
        info!(
            "Collection complete: {} live, {} cached, {} fallback, {} adapter calls, {} degraded sources",
            summary.live,
            summary.cached,
            summary.fallback,
            out.stats.adapter_calls,
            out.degraded_sources.len()
        );

        out
    }

    /// Obtain one signal: live with retries, else cache, else fallback
    async fn obtain(
        &self,
        entity_id: &EntityId,
        source_id: &SourceId,
        signal_type: SignalType,
        ctx: &CycleContext,
    ) -> Fetched {
        let Some(adapter) = self.adapters.get(source_id) else {
            let error = SourceError::Config(format!("unknown source {}", source_id));
            warn!("{} (entity {}, signal {})", error, entity_id, signal_type);
            return self.cache_or_fallback(
                entity_id,
                source_id,
                signal_type,
                true,
                Some(error.to_string()),
            );
        };

        if adapter.force_fallback() {
            debug!(
                "Source {} forced to fallback for {}/{}",
                source_id, entity_id, signal_type
            );
            return self.cache_or_fallback(
                entity_id,
                source_id,
                signal_type,
                adapter.supports_caching(),
                None,
            );
        }

        let timeout = self.config.source_timeout();
        let mut attempt = 0;

        loop {
            let outcome = match ctx.limiter.acquire().await {
                Ok(_permit) => {
                    ctx.count_call(source_id);
                    match tokio::time::timeout(timeout, adapter.fetch(entity_id, signal_type, timeout))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(SourceError::Timeout(self.config.source_timeout_ms)),
                    }
                }
                Err(_) => Err(SourceError::Transient("concurrency limiter closed".to_string())),
            };

            let outcome = outcome.and_then(|result| {
                if result.entity_id != *entity_id || result.signal_type != signal_type {
                    Err(SourceError::Extraction(format!(
                        "source returned {}/{} for {}/{}",
                        result.entity_id, result.signal_type, entity_id, signal_type
                    )))
                } else {
                    Ok(result)
                }
            });

            match outcome {
                Ok(mut result) => {
                    result.source_id = source_id.clone();
                    result.provenance = Provenance::Live;
                    if adapter.supports_caching() {
                        match check_payload(signal_type, &result.payload) {
                            Ok(()) => self.cache.put(&result),
                            Err(reason) => debug!(
                                "Not caching {}/{}/{}: {}",
                                entity_id, source_id, signal_type, reason
                            ),
                        }
                    }
                    debug!(
                        "Fetched {}/{}/{} live (confidence {:.2})",
                        entity_id, source_id, signal_type, result.confidence
                    );
                    return Fetched {
                        result,
                        degraded: None,
                    };
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.backoff(attempt);
                    warn!(
                        "Fetch {}/{}/{} failed: {}; retry {} of {} in {:?}",
                        entity_id,
                        source_id,
                        signal_type,
                        e,
                        attempt + 1,
                        self.config.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        "Fetch {}/{}/{} gave up: {}",
                        entity_id, source_id, signal_type, e
                    );
                    if e.is_degrading() {
                        warn!("Source {} degraded: {}", source_id, e);
                    }
                    let degraded = e.is_degrading().then(|| e.to_string());
                    return self.cache_or_fallback(
                        entity_id,
                        source_id,
                        signal_type,
                        adapter.supports_caching(),
                        degraded,
                    );
                }
            }
        }
    }

    fn cache_or_fallback(
        &self,
        entity_id: &EntityId,
        source_id: &SourceId,
        signal_type: SignalType,
        use_cache: bool,
        degraded: Option<String>,
    ) -> Fetched {
        let now = now_millis();
        let cached = if use_cache {
            self.cache.get(entity_id, source_id, signal_type, now)
        } else {
            None
        };

        let result = match cached {
            Some(hit) => {
                debug!(
                    "Serving {}/{}/{} from cache (confidence {:.2})",
                    entity_id, source_id, signal_type, hit.confidence
                );
                hit
            }
            None => {
                debug!(
                    "No usable cache entry for {}/{}/{}; using neutral fallback",
                    entity_id, source_id, signal_type
                );
                SignalResult::fallback(
                    source_id.clone(),
                    entity_id.clone(),
                    signal_type,
                    self.config.fallback_confidence,
                    now,
                )
            }
        };

        Fetched { result, degraded }
    }
}
