//! Dashboard query service.
//!
//! Each view scans a bounded slice of the store and feeds it to the pure
//! aggregation functions. Views fail independently: a store error, timeout
//! or undecodable record turns that view into its empty value.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_core::limits::{
    DEFAULT_TOP_PAGES, DEFAULT_TOP_REFERRERS, DEFAULT_WINDOW_HOURS, HOUR_MS, REFERRER_WINDOW_HOURS,
};
use engine_core::{ActiveSessionProjection, Clock, DisplayZone, Error, Event, ReferrerTable, Result, Session};
use serde::de::DeserializeOwned;
use serde::Serialize;
use store::{decode_all, KeyCondition, ScanFilter, Store, TableNames, EXPIRES_AT, SESSION_INDEX};
use telemetry::metrics;
use tracing::warn;

use crate::aggregate::{
    self, ActiveSessionView, Bucket, HourDetails, PageCount, PageDetails, Realtime, ReferrerCount,
    ReferrerDetails, SessionStats, Summary,
};
use crate::cache::ViewCache;
use crate::params::{BucketParams, WindowParams};

/// Dashboard view limits.
#[derive(Debug, Clone, Copy)]
pub struct ViewLimits {
    pub cache_ttl: Duration,
    pub scan_timeout: Duration,
    pub scan_limit: usize,
}

pub struct DashboardService {
    store: Arc<dyn Store>,
    tables: TableNames,
    clock: Arc<dyn Clock>,
    zone: DisplayZone,
    referrers: ReferrerTable,
    cache: ViewCache,
    limits: ViewLimits,
    active_horizon_ms: i64,
}

impl DashboardService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        tables: TableNames,
        clock: Arc<dyn Clock>,
        zone: DisplayZone,
        referrers: ReferrerTable,
        cache: ViewCache,
        limits: ViewLimits,
        active_horizon_ms: i64,
    ) -> Self {
        Self {
            store,
            tables,
            clock,
            zone,
            referrers,
            cache,
            limits,
            active_horizon_ms,
        }
    }

    pub fn cache(&self) -> &ViewCache {
        &self.cache
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Serve one view through the cache, degrading to `T::default()` on failure.
    async fn view<T, F, Fut>(&self, name: &'static str, key: String, compute: F) -> T
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let scan_timeout = self.limits.scan_timeout;

        let result = self
            .cache
            .get_or_compute(&key, self.limits.cache_ttl, || async move {
                let value = tokio::time::timeout(scan_timeout, compute())
                    .await
                    .map_err(|_| Error::store(format!("view timed out after {:?}", scan_timeout)))??;
                Ok(serde_json::to_value(value)?)
            })
            .await
            .and_then(|value| serde_json::from_value(value).map_err(Error::from));

        metrics()
            .view_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        match result {
            Ok(value) => {
                metrics().views_served.inc();
                value
            }
            Err(e) => {
                metrics().views_degraded.inc();
                warn!(view = name, code = e.code(), error = %e, "View degraded to empty result");
                T::default()
            }
        }
    }

    async fn scan_events(&self, filter: ScanFilter) -> Result<Vec<Event>> {
        let items = self
            .store
            .scan(&self.tables.events, Some(&filter), Some(self.limits.scan_limit))
            .await?;
        decode_all(&items)
    }

    async fn events_since(&self, now: i64, span_ms: i64) -> Result<Vec<Event>> {
        self.scan_events(ScanFilter::between("timestamp", now - span_ms, now))
            .await
    }

    async fn page_views_since(&self, now: i64, span_ms: i64) -> Result<Vec<Event>> {
        self.scan_events(
            ScanFilter::between("timestamp", now - span_ms, now)
                .and(ScanFilter::equals("event_type", "page_view")),
        )
        .await
    }

    async fn live_projections(&self, now: i64) -> Result<Vec<ActiveSessionProjection>> {
        let filter = ScanFilter::between(EXPIRES_AT, now.saturating_add(1), i64::MAX);
        let items = self
            .store
            .scan(&self.tables.active_sessions, Some(&filter), Some(self.limits.scan_limit))
            .await?;
        decode_all(&items)
    }

    /// Fixed-length activity histogram ending at now.
    pub async fn hourly(&self, buckets: BucketParams, window: WindowParams) -> Vec<Bucket> {
        let now = self.now();
        let key = format!("hourly:{}:{}:{}", buckets.count, buckets.width_minutes, window.hours);
        let zone = self.zone;
        self.view("hourly", key, || async move {
            let events = self.events_since(now, window.span_ms()).await?;
            Ok(aggregate::bucket_counts(
                &events,
                now,
                buckets.width_ms(),
                buckets.count,
                &zone,
            ))
        })
        .await
    }

    pub async fn top_pages(&self, window: WindowParams, limit: usize) -> Vec<PageCount> {
        let now = self.now();
        let key = format!("pages:{}:{}", window.hours, limit);
        self.view("top_pages", key, || async move {
            let events = self.page_views_since(now, window.span_ms()).await?;
            Ok(aggregate::top_pages(&events, limit))
        })
        .await
    }

    /// Referrer labels over the last week of page views.
    pub async fn referrers(&self) -> Vec<ReferrerCount> {
        let now = self.now();
        self.view("referrers", "referrers".to_string(), || async move {
            let events = self
                .page_views_since(now, REFERRER_WINDOW_HOURS * HOUR_MS)
                .await?;
            Ok(aggregate::top_referrers(
                &events,
                DEFAULT_TOP_REFERRERS as usize,
                &self.referrers,
            ))
        })
        .await
    }

    pub async fn summary(&self) -> Summary {
        let now = self.now();
        self.view("summary", "summary".to_string(), || async move {
            let active = self.live_projections(now).await?;
            let recent = self.events_since(now, DEFAULT_WINDOW_HOURS * HOUR_MS).await?;
            Ok(aggregate::summarize(&active, &recent, now))
        })
        .await
    }

    pub async fn session_stats(&self) -> SessionStats {
        let now = self.now();
        let horizon = self.active_horizon_ms;
        self.view("session_stats", "session_stats".to_string(), || async move {
            let items = self
                .store
                .scan(&self.tables.sessions, None, Some(self.limits.scan_limit))
                .await?;
            let sessions: Vec<Session> = decode_all(&items)?;
            Ok(aggregate::session_stats(&sessions, now, horizon))
        })
        .await
    }

    /// Overview of the newest events of the last day.
    pub async fn realtime(&self) -> Realtime {
        let now = self.now();
        let zone = self.zone;
        self.view("realtime", "realtime".to_string(), || async move {
            let mut events = self.events_since(now, DEFAULT_WINDOW_HOURS * HOUR_MS).await?;
            events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            Ok(aggregate::realtime_overview(&events, now, &zone, DEFAULT_TOP_PAGES as usize))
        })
        .await
    }

    pub async fn active_sessions(&self) -> Vec<ActiveSessionView> {
        let now = self.now();
        self.view("active_sessions", "active_sessions".to_string(), || async move {
            let projections = self.live_projections(now).await?;
            Ok(aggregate::active_sessions(&projections, now))
        })
        .await
    }

    /// Events of one session in timestamp order.
    pub async fn session_events(&self, session_id: &str) -> Vec<Event> {
        let key = format!("session_events:{}", session_id);
        self.view("session_events", key, || async move {
            let items = self
                .store
                .query(
                    &self.tables.events,
                    SESSION_INDEX,
                    &KeyCondition::new("session_id", session_id),
                )
                .await?;
            let mut events: Vec<Event> = decode_all(&items)?;
            events.sort_by_key(|e| e.timestamp);
            Ok(events)
        })
        .await
    }

    pub async fn hour_details(&self, hour: &str, width_minutes: i64) -> HourDetails {
        let now = self.now();
        let zone = self.zone;
        let width_ms = BucketParams {
            count: 1,
            width_minutes,
        }
        .width_ms();
        let key = format!("hour_details:{}:{}", hour, width_minutes);
        let details = self
            .view("hour_details", key, || async move {
                let events = self.events_since(now, DEFAULT_WINDOW_HOURS * HOUR_MS).await?;
                Ok(aggregate::hour_details(&events, hour, width_ms, &zone))
            })
            .await;
        with_key(details, |d| d.hour.is_empty(), |d| d.hour = hour.to_string())
    }

    pub async fn page_details(&self, page_url: &str) -> PageDetails {
        let now = self.now();
        let zone = self.zone;
        let key = format!("page_details:{}", page_url);
        let details = self
            .view("page_details", key, || async move {
                let events = self
                    .page_views_since(now, DEFAULT_WINDOW_HOURS * HOUR_MS)
                    .await?;
                Ok(aggregate::page_details(&events, page_url, &zone))
            })
            .await;
        with_key(details, |d| d.page_url.is_empty(), |d| d.page_url = page_url.to_string())
    }

    pub async fn referrer_details(&self, referrer: &str) -> ReferrerDetails {
        let now = self.now();
        let zone = self.zone;
        let key = format!("referrer_details:{}", referrer);
        let details = self
            .view("referrer_details", key, || async move {
                let events = self
                    .page_views_since(now, REFERRER_WINDOW_HOURS * HOUR_MS)
                    .await?;
                Ok(aggregate::referrer_details(&events, referrer, &self.referrers, &zone))
            })
            .await;
        with_key(details, |d| d.referrer.is_empty(), |d| d.referrer = referrer.to_string())
    }
}

/// Degraded detail views still echo the requested key.
fn with_key<T>(mut details: T, missing: impl Fn(&T) -> bool, fill: impl FnOnce(&mut T)) -> T {
    if missing(&details) {
        fill(&mut details);
    }
    details
}
