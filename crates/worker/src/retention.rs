//! Retention worker for TTL-based deletion.
//!
//! Projections always carry `expires_at`; events only when an event TTL is
//! configured. Reads already ignore expired projections, so this only
//! reclaims space.

use std::sync::Arc;

use engine_core::{Clock, Result};
use store::{Store, TableNames, EXPIRES_AT};
use telemetry::metrics;
use tracing::{debug, info};

/// Items removed by one retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub projections: u64,
    pub events: u64,
}

impl RetentionReport {
    pub fn total(&self) -> u64 {
        self.projections + self.events
    }
}

/// Worker that purges expired items.
pub struct RetentionWorker {
    store: Arc<dyn Store>,
    tables: TableNames,
    clock: Arc<dyn Clock>,
}

impl RetentionWorker {
    pub fn new(store: Arc<dyn Store>, tables: TableNames, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            tables,
            clock,
        }
    }

    /// Run one retention pass across the projection and event tables.
    pub async fn run(&self) -> Result<RetentionReport> {
        let now = self.clock.now_ms();

        let report = RetentionReport {
            projections: self
                .store
                .purge_expired(&self.tables.active_sessions, EXPIRES_AT, now)
                .await?,
            events: self
                .store
                .purge_expired(&self.tables.events, EXPIRES_AT, now)
                .await?,
        };

        metrics().items_purged.inc_by(report.total());
        if report.total() > 0 {
            info!(
                projections = report.projections,
                events = report.events,
                "Purged expired items"
            );
        } else {
            debug!("Retention pass found nothing to purge");
        }

        Ok(report)
    }
}
