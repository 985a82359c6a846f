//! Event collection pipeline: ingest, resolve the session, persist the event.

use std::sync::Arc;
use std::time::Instant;

use engine_core::limits::DAY_MS;
use engine_core::{ingest, Clock, Error, Event, IngestOptions, Result, TransportContext};
use serde::Serialize;
use store::codec::with_expiry;
use store::{Record, Store, TableNames};
use telemetry::metrics;
use tracing::{debug, error, warn};

use crate::session_manager::{Outcome, SessionManager};

/// Acknowledgement for one collected event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub event_id: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub session_persisted: bool,
}

pub struct EventCollector {
    store: Arc<dyn Store>,
    tables: TableNames,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
    ingest_options: IngestOptions,
    event_ttl_days: Option<u32>,
}

impl EventCollector {
    pub fn new(
        store: Arc<dyn Store>,
        tables: TableNames,
        sessions: SessionManager,
        clock: Arc<dyn Clock>,
        ingest_options: IngestOptions,
        event_ttl_days: Option<u32>,
    ) -> Self {
        Self {
            store,
            tables,
            sessions,
            clock,
            ingest_options,
            event_ttl_days,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Ingest a raw payload and collect the resulting event.
    pub async fn accept(&self, payload: &[u8], ctx: &TransportContext) -> Result<Receipt> {
        let started = Instant::now();
        metrics().events_received.inc();

        let event = match ingest(payload, ctx, self.clock.now_ms(), &self.ingest_options) {
            Ok(event) => event,
            Err(e) => {
                metrics().events_rejected.inc();
                debug!(code = e.code(), error = %e, "Rejected event payload");
                return Err(e);
            }
        };

        let receipt = self.collect(event).await;
        metrics()
            .ingest_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        receipt
    }

    /// Resolve the session for an already validated event and store the event.
    ///
    /// A session persist failure does not fail collection; the event is
    /// still written and stamped with the resolved session id.
    pub async fn collect(&self, event: Event) -> Result<Receipt> {
        let (event, outcome, session_persisted) = match self.sessions.resolve_session(&event).await {
            Ok(resolved) => {
                let id = resolved.session.session_id;
                (event.with_session(id), Some(resolved.outcome), true)
            }
            Err(Error::SessionPersist { session_id, message }) => {
                warn!(session_id = %session_id, reason = %message, "Collecting event without a persisted session");
                (event.with_session(session_id), None, false)
            }
            Err(e) => return Err(e),
        };

        let mut item = event.to_item();
        if let Some(days) = self.event_ttl_days {
            let ttl_ms = i64::from(days).saturating_mul(DAY_MS);
            item = with_expiry(item, event.timestamp.saturating_add(ttl_ms));
        }

        if let Err(e) = self.store.put(&self.tables.events, item).await {
            metrics().event_write_errors.inc();
            error!(event_id = %event.event_id, error = %e, "Failed to store event");
            return Err(Error::store(format!("failed to store event: {}", e)));
        }

        metrics().events_accepted.inc();
        debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            session_id = ?event.session_id,
            "Event collected"
        );

        Ok(Receipt {
            event_id: event.event_id,
            session_id: event.session_id.unwrap_or_default(),
            outcome,
            session_persisted,
        })
    }
}
