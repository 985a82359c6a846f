//! Internal metrics collection.
//!
//! Counters, gauges and latency histograms kept in memory; the worker logs
//! a periodic snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the analytics pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion
    pub events_received: Counter,
    pub events_accepted: Counter,
    pub events_rejected: Counter,
    pub event_write_errors: Counter,

    // Session manager
    pub sessions_created: Counter,
    pub sessions_updated: Counter,
    pub sessions_recreated: Counter,
    pub session_persist_errors: Counter,

    // Store adapter
    pub store_errors: Counter,
    pub items_purged: Counter,

    // Dashboard views
    pub views_served: Counter,
    pub views_degraded: Counter,

    // View cache
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub cache_expired: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub view_latency_ms: Histogram,
    pub store_latency_ms: Histogram,

    // Gauges
    pub cache_entries: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_received: u64,
    pub events_accepted: u64,
    pub events_rejected: u64,
    pub event_write_errors: u64,
    pub sessions_created: u64,
    pub sessions_updated: u64,
    pub sessions_recreated: u64,
    pub session_persist_errors: u64,
    pub store_errors: u64,
    pub items_purged: u64,
    pub views_served: u64,
    pub views_degraded: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_expired: u64,
    pub cache_entries: u64,
    pub ingest_latency_mean_ms: f64,
    pub view_latency_mean_ms: f64,
    pub store_latency_mean_ms: f64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_received: self.events_received.get(),
            events_accepted: self.events_accepted.get(),
            events_rejected: self.events_rejected.get(),
            event_write_errors: self.event_write_errors.get(),
            sessions_created: self.sessions_created.get(),
            sessions_updated: self.sessions_updated.get(),
            sessions_recreated: self.sessions_recreated.get(),
            session_persist_errors: self.session_persist_errors.get(),
            store_errors: self.store_errors.get(),
            items_purged: self.items_purged.get(),
            views_served: self.views_served.get(),
            views_degraded: self.views_degraded.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            cache_expired: self.cache_expired.get(),
            cache_entries: self.cache_entries.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            view_latency_mean_ms: self.view_latency_ms.mean(),
            store_latency_mean_ms: self.store_latency_ms.mean(),
        }
    }

    /// Share of view lookups answered from the cache, 0.0 when none.
    pub fn cache_hit_ratio(&self) -> f64 {
        let hits = self.cache_hits.get();
        let total = hits + self.cache_misses.get();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
