//! Short-TTL memoization of computed views.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_core::Result;
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::Expiry;
use serde_json::Value;
use telemetry::metrics;
use tracing::debug;

/// Maximum cache entries.
const VIEW_CACHE_MAX_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct CachedView {
    value: Arc<Value>,
    ttl: Duration,
}

/// Per-entry time-to-live, fixed at insert time.
struct PerEntryTtl;

impl Expiry<String, CachedView> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CachedView, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedView,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Cache of serialized view results.
///
/// Concurrent misses for the same key may each recompute; the last write wins.
#[derive(Clone)]
pub struct ViewCache {
    inner: Cache<String, CachedView>,
    expired: Arc<AtomicU64>,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new(VIEW_CACHE_MAX_CAPACITY)
    }
}

impl ViewCache {
    pub fn new(max_capacity: u64) -> Self {
        let expired = Arc::new(AtomicU64::new(0));
        let counter = expired.clone();
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Expired {
                    counter.fetch_add(1, Ordering::Relaxed);
                    metrics().cache_expired.inc();
                }
            })
            .build();
        Self { inner, expired }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key).await.map(|v| (*v.value).clone())
    }

    /// Store `value` for `ttl`. A zero TTL stores nothing.
    pub async fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.inner
            .insert(
                key.into(),
                CachedView {
                    value: Arc::new(value),
                    ttl,
                },
            )
            .await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Evict expired entries now. Returns how many expired entries were removed.
    pub async fn sweep_expired(&self) -> u64 {
        let before = self.expired.load(Ordering::Relaxed);
        self.inner.run_pending_tasks().await;
        metrics().cache_entries.set(self.inner.entry_count());
        self.expired.load(Ordering::Relaxed).saturating_sub(before)
    }

    /// Number of live entries, approximate until pending tasks have run.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Return the cached value or compute, store and return it. Errors are not cached.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(hit) = self.get(key).await {
            metrics().cache_hits.inc();
            debug!(key = %key, "View cache hit");
            return Ok(hit);
        }

        metrics().cache_misses.inc();
        debug!(key = %key, "View cache miss");
        let value = compute().await?;
        self.set(key, value.clone(), ttl).await;
        Ok(value)
    }
}
