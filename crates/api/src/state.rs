//! Application state shared across handlers.

use std::sync::Arc;

use analytics::{Analytics, DashboardService, EventCollector};
use store::Store;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Backing store, used directly for health checks
    pub store: Arc<dyn Store>,
    pub analytics: Analytics,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, analytics: Analytics) -> Self {
        Self { store, analytics }
    }

    pub fn collector(&self) -> &EventCollector {
        &self.analytics.collector
    }

    pub fn dashboard(&self) -> &DashboardService {
        &self.analytics.dashboard
    }
}
