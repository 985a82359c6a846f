//! Common test setup functions.

use analytics::{Analytics, AnalyticsConfig};
use api::{router, state::AppState};
use axum::Router;
use engine_core::ManualClock;
use std::sync::Arc;
use store::{MemoryStore, Store, TableNames};

use crate::mocks::FlakyStore;

/// Fixed start time for tests: 2024-03-05 14:07:09 UTC.
pub const T0: i64 = 1_709_647_629_000;

/// Test context over the in-memory store and a manual clock.
///
/// The router is the production router; only the store and the clock are
/// swapped. The view cache is disabled so that every request sees the
/// current store contents.
pub struct TestContext {
    pub store: FlakyStore,
    pub clock: ManualClock,
    pub analytics: Analytics,
    pub router: Router,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(AnalyticsConfig {
            cache_ttl_secs: 0,
            ..Default::default()
        })
        .await
    }

    pub async fn with_config(config: AnalyticsConfig) -> Self {
        let tables = TableNames::default();
        let store = FlakyStore::new(Arc::new(MemoryStore::new(&tables)));
        let clock = ManualClock::new(T0);

        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let analytics = Analytics::new(shared.clone(), tables, Arc::new(clock.clone()), &config)
            .expect("valid analytics config");
        let router = router(AppState::new(shared, analytics.clone()));

        Self {
            store,
            clock,
            analytics,
            router,
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        self.store.inner()
    }

    /// Advance the manual clock.
    pub fn advance_ms(&self, delta_ms: i64) {
        self.clock.advance(delta_ms);
    }
}
