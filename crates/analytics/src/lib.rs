//! Session derivation, event collection and the dashboard views.

pub mod aggregate;
pub mod cache;
pub mod collector;
pub mod config;
pub mod params;
pub mod session_manager;
pub mod views;

use std::sync::Arc;

use engine_core::{Clock, Result};
use store::{Store, TableNames};

pub use cache::ViewCache;
pub use collector::{EventCollector, Receipt};
pub use config::AnalyticsConfig;
pub use session_manager::{Outcome, ResolvedSession, SessionManager, SessionPolicy};
pub use views::{DashboardService, ViewLimits};

/// The collector and dashboard wired over one store and clock.
#[derive(Clone)]
pub struct Analytics {
    pub collector: Arc<EventCollector>,
    pub dashboard: Arc<DashboardService>,
}

impl Analytics {
    pub fn new(
        store: Arc<dyn Store>,
        tables: TableNames,
        clock: Arc<dyn Clock>,
        config: &AnalyticsConfig,
    ) -> Result<Self> {
        let zone = config.display_zone()?;
        let policy = config.session_policy();

        let sessions = SessionManager::new(store.clone(), tables.clone(), policy);
        let collector = EventCollector::new(
            store.clone(),
            tables.clone(),
            sessions,
            clock.clone(),
            config.ingest_options(),
            config.event_ttl_days,
        );

        let dashboard = DashboardService::new(
            store,
            tables,
            clock,
            zone,
            config.referrer_table(),
            ViewCache::new(config.cache_max_entries),
            ViewLimits {
                cache_ttl: config.cache_ttl(),
                scan_timeout: config.scan_timeout(),
                scan_limit: config.scan_limit.max(1),
            },
            policy.active_horizon_ms,
        );

        Ok(Self {
            collector: Arc::new(collector),
            dashboard: Arc::new(dashboard),
        })
    }

    pub fn cache(&self) -> &ViewCache {
        self.dashboard.cache()
    }
}
