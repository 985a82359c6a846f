//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;

use analytics::ViewCache;
use serde::{Deserialize, Serialize};
use store::Store;
use telemetry::{health, metrics};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::retention::RetentionWorker;

/// Intervals of the background tasks, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub cache_sweep_secs: u64,
    pub retention_secs: u64,
    pub health_check_secs: u64,
    pub metrics_report_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_sweep_secs: 60,
            retention_secs: 300,
            health_check_secs: 15,
            metrics_report_secs: 60,
        }
    }
}

fn every(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: Arc<dyn Store>,
    cache: ViewCache,
    retention: RetentionWorker,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn Store>,
        cache: ViewCache,
        retention: RetentionWorker,
    ) -> Self {
        Self {
            config,
            store,
            cache,
            retention,
        }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_cache_sweep().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_retention_worker().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_health_check().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_report().await;
        }));

        health().worker.set_healthy();
        info!("Background workers started");
        handles
    }

    async fn run_cache_sweep(&self) {
        let mut ticker = interval(every(self.config.cache_sweep_secs));

        loop {
            ticker.tick().await;
            let removed = self.cache.sweep_expired().await;
            if removed > 0 {
                info!(removed, remaining = self.cache.entry_count(), "Swept expired view cache entries");
            }
        }
    }

    async fn run_retention_worker(&self) {
        let mut ticker = interval(every(self.config.retention_secs));

        loop {
            ticker.tick().await;

            match self.retention.run().await {
                Ok(_) => health().worker.set_healthy(),
                Err(e) => {
                    error!("Retention worker error: {}", e);
                    health().worker.set_unhealthy(format!("retention: {}", e));
                }
            }
        }
    }

    /// Check the store; the result drives readiness.
    pub async fn check_store(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => {
                if !health().store.is_healthy() {
                    info!(backend = self.store.backend(), "Store reachable");
                }
                health().store.set_healthy();
                true
            }
            Err(e) => {
                warn!(backend = self.store.backend(), error = %e, "Store health check failed");
                health().store.set_unhealthy(e.to_string());
                false
            }
        }
    }

    async fn run_health_check(&self) {
        let mut ticker = interval(every(self.config.health_check_secs));

        loop {
            ticker.tick().await;
            self.check_store().await;
        }
    }

    async fn run_metrics_report(&self) {
        let mut ticker = interval(every(self.config.metrics_report_secs));

        loop {
            ticker.tick().await;

            let m = metrics();
            let snapshot = m.snapshot();
            info!(
                events_received = snapshot.events_received,
                events_accepted = snapshot.events_accepted,
                events_rejected = snapshot.events_rejected,
                sessions_created = snapshot.sessions_created,
                sessions_updated = snapshot.sessions_updated,
                sessions_recreated = snapshot.sessions_recreated,
                session_persist_errors = snapshot.session_persist_errors,
                views_degraded = snapshot.views_degraded,
                cache_entries = snapshot.cache_entries,
                cache_hit_ratio = m.cache_hit_ratio(),
                ingest_latency_mean_ms = snapshot.ingest_latency_mean_ms,
                view_latency_mean_ms = snapshot.view_latency_mean_ms,
                "Metrics report"
            );
        }
    }
}
