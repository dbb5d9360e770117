//! Memoized audit results
//!
//! Results are kept for a fixed TTL and the map is bounded: expired entries
//! are dropped lazily on read, by `purge_expired`, and before evicting the
//! oldest entries when an insert would exceed capacity.
//!
//! At most one audit runs per token at a time. The first caller registers a
//! shared future in `in_flight`; concurrent callers for the same token await
//! that future instead of starting another audit.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::audit::auditor::RiskAuditor;
use crate::audit::config::AuditCacheConfig;
use crate::audit::types::{AuditResult, TokenData};

type PendingAudit = Shared<BoxFuture<'static, Arc<AuditResult>>>;

/// Cached result with its creation time
#[derive(Clone)]
pub struct CachedAudit {
    pub result: Arc<AuditResult>,
    pub cached_at: Instant,
}

impl CachedAudit {
    pub fn new(result: Arc<AuditResult>) -> Self {
        Self {
            result,
            cached_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() >= ttl
    }
}

/// Cache statistics for monitoring
#[derive(Default)]
pub struct AuditCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    /// Callers that joined an audit already in progress
    pub joined: AtomicU64,
    pub computed: AtomicU64,
    pub evictions: AtomicU64,
}

impl AuditCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Bounded result map shared with in-flight computations
struct ResultStore {
    entries: DashMap<String, CachedAudit>,
    ttl: Duration,
    capacity: usize,
    stats: AuditCacheStats,
}

impl ResultStore {
    fn lookup(&self, token: &str) -> Option<Arc<AuditResult>> {
        if let Some(entry) = self.entries.get(token) {
            if !entry.is_expired(self.ttl) {
                return Some(entry.result.clone());
            }
            drop(entry);
            self.entries
                .remove_if(token, |_, entry| entry.is_expired(self.ttl));
        }
        None
    }

    fn store(&self, token: String, result: Arc<AuditResult>) {
        if !self.entries.contains_key(&token) && self.entries.len() >= self.capacity {
            self.purge_expired();
            self.evict_oldest();
        }
        self.entries.insert(token, CachedAudit::new(result));
    }

    fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
        before.saturating_sub(self.entries.len())
    }

    /// Make room for one insert
    fn evict_oldest(&self) {
        let excess = (self.entries.len() + 1).saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }

        let mut by_age: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), r.value().cached_at))
            .collect();
        by_age.sort_by_key(|(_, cached_at)| *cached_at);

        for (key, _) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// TTL cache in front of the [`RiskAuditor`]
pub struct AuditCache {
    auditor: Arc<RiskAuditor>,
    store: Arc<ResultStore>,
    in_flight: Arc<DashMap<String, PendingAudit>>,
}

impl AuditCache {
    pub fn new(auditor: Arc<RiskAuditor>, config: &AuditCacheConfig) -> Self {
        Self {
            auditor,
            store: Arc::new(ResultStore {
                entries: DashMap::with_capacity(config.capacity.min(1024)),
                ttl: config.ttl(),
                capacity: config.capacity.max(1),
                stats: AuditCacheStats::default(),
            }),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Return the cached result for `token` if still fresh, otherwise audit
    /// it and cache the new result
    pub async fn get_or_compute(&self, token: &str, data: &TokenData) -> Arc<AuditResult> {
        if let Some(result) = self.store.lookup(token) {
            self.store.stats.hits.fetch_add(1, Ordering::Relaxed);
            debug!(token, "Audit cache hit");
            return result;
        }
        self.store.stats.misses.fetch_add(1, Ordering::Relaxed);

        let pending = match self.in_flight.entry(token.to_string()) {
            Entry::Occupied(entry) => {
                self.store.stats.joined.fetch_add(1, Ordering::Relaxed);
                debug!(token, "Joining audit already in progress");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // Finished between the lookup above and taking the slot
                if let Some(result) = self.store.lookup(token) {
                    return result;
                }
                let pending = self.start_audit(token, data);
                entry.insert(pending.clone());
                // Runs to completion even if every caller goes away
                tokio::spawn(pending.clone());
                pending
            }
        };

        pending.await
    }

    fn start_audit(&self, token: &str, data: &TokenData) -> PendingAudit {
        let auditor = self.auditor.clone();
        let store = self.store.clone();
        let in_flight = self.in_flight.clone();
        let token = token.to_string();
        let data = data.clone();

        async move {
            let result = Arc::new(auditor.audit(&token, &data).await);
            store.stats.computed.fetch_add(1, Ordering::Relaxed);
            store.store(token.clone(), result.clone());
            in_flight.remove(&token);
            result
        }
        .boxed()
        .shared()
    }

    /// Fresh cached result, without auditing
    pub fn get(&self, token: &str) -> Option<Arc<AuditResult>> {
        self.store.lookup(token)
    }

    /// Drop all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let removed = self.store.purge_expired();
        if removed > 0 {
            debug!(removed, "Purged expired audit results");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.entries.is_empty()
    }

    pub fn stats(&self) -> &AuditCacheStats {
        &self.store.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::auditor::tests::{auditor_with, FakeProvider};
    use crate::audit::config::AuditConfig;

    fn cache_with(
        provider: Arc<FakeProvider>,
        ttl: Duration,
        capacity: usize,
    ) -> AuditCache {
        let auditor = Arc::new(auditor_with(&AuditConfig::default(), provider));
        let config = AuditCacheConfig {
            ttl_ms: ttl.as_millis() as u64,
            capacity,
        };
        AuditCache::new(auditor, &config)
    }

    #[tokio::test]
    async fn test_hit_within_ttl_is_identical() {
        let provider = Arc::new(FakeProvider::healthy());
        let cache = cache_with(provider.clone(), Duration::from_secs(60), 100);
        let data = TokenData::default();

        let first = cache.get_or_compute("mint", &data).await;
        let second = cache.get_or_compute("mint", &data).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.holder_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().computed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_recompute_after_expiry() {
        let provider = Arc::new(FakeProvider::healthy());
        let cache = cache_with(provider.clone(), Duration::from_millis(50), 100);
        let data = TokenData::default();

        let first = cache.get_or_compute("mint", &data).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("mint").is_none());

        let second = cache.get_or_compute("mint", &data).await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(provider.holder_calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_audit() {
        let provider = Arc::new(FakeProvider {
            delay: Duration::from_millis(100),
            ..FakeProvider::healthy()
        });
        let cache = cache_with(provider.clone(), Duration::from_secs(60), 100);
        let data = TokenData::default();

        let results = futures::future::join_all(
            (0..5).map(|_| cache.get_or_compute("mint", &data)),
        )
        .await;

        assert_eq!(provider.holder_calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(cache.stats().joined.load(Ordering::Relaxed), 4);
        assert!(cache.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let provider = Arc::new(FakeProvider::healthy());
        let cache = cache_with(provider, Duration::from_secs(60), 2);
        let data = TokenData::default();

        for token in ["a", "b", "c"] {
            cache.get_or_compute(token, &data).await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let provider = Arc::new(FakeProvider::healthy());
        let cache = cache_with(provider, Duration::from_millis(30), 100);
        let data = TokenData::default();

        cache.get_or_compute("a", &data).await;
        cache.get_or_compute("b", &data).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hit_rate() {
        let stats = AuditCacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        stats.hits.store(3, Ordering::Relaxed);
        stats.misses.store(1, Ordering::Relaxed);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
