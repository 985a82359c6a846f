//! Session Manager.
//!
//! Resolves the session an event belongs to, folds the event into it and
//! writes both the session and its active projection back to the store.
//!
//! Read-then-write is not transactional: concurrent events for one session
//! race and the last write wins.

use std::fmt;
use std::sync::Arc;

use engine_core::limits::{DEFAULT_ACTIVE_SESSION_MINUTES, MINUTE_MS};
use engine_core::{ids, ActiveSessionProjection, Error, Event, Result, Session};
use serde::Serialize;
use store::{key_item, Record, Store, TableNames};
use telemetry::metrics;
use tracing::{debug, error, info};

/// How a session was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The event carried no session id
    Created,
    /// The supplied session id resolved and was updated
    Updated,
    /// The supplied session id could not be used; a new session replaced it
    Recreated,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Recreated => "recreated",
        };
        f.write_str(s)
    }
}

/// A session after folding in one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session: Session,
    pub outcome: Outcome,
}

/// Session policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// How long a session stays "online now" after its last activity
    pub active_horizon_ms: i64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            active_horizon_ms: DEFAULT_ACTIVE_SESSION_MINUTES * MINUTE_MS,
        }
    }
}

enum Step {
    Lookup(String),
    Create { replaces: Option<String> },
}

enum Lookup {
    Found(Session),
    Missing,
    Failed(Error),
}

pub struct SessionManager {
    store: Arc<dyn Store>,
    tables: TableNames,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>, tables: TableNames, policy: SessionPolicy) -> Self {
        Self {
            store,
            tables,
            policy,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    async fn lookup(&self, session_id: &str) -> Lookup {
        let key = key_item(Session::KEY, session_id);
        match self.store.get(&self.tables.sessions, &key).await {
            Ok(Some(item)) => match Session::from_item(&item) {
                Ok(session) => Lookup::Found(session),
                Err(e) => Lookup::Failed(e),
            },
            Ok(None) => Lookup::Missing,
            Err(e) => Lookup::Failed(e),
        }
    }

    /// Resolve and persist the session for `event`.
    ///
    /// A supplied session id that is missing, unreadable or corrupted is
    /// replaced by a new session. The fallback runs at most once.
    pub async fn resolve_session(&self, event: &Event) -> Result<ResolvedSession> {
        let mut step = match event.session_id.as_deref() {
            Some(id) => Step::Lookup(id.to_string()),
            None => Step::Create { replaces: None },
        };

        let resolved = loop {
            step = match step {
                Step::Lookup(id) => match self.lookup(&id).await {
                    Lookup::Found(mut session) => {
                        session.record(event);
                        break ResolvedSession {
                            session,
                            outcome: Outcome::Updated,
                        };
                    }
                    Lookup::Missing => {
                        info!(session_id = %id, "Unknown session id, starting a new session");
                        Step::Create { replaces: Some(id) }
                    }
                    Lookup::Failed(e) => {
                        info!(session_id = %id, reason = %e, "Session unreadable, starting a new session");
                        Step::Create { replaces: Some(id) }
                    }
                },
                Step::Create { replaces } => {
                    let session_id = ids::generate_session_id(event.timestamp, &event.user_id);
                    let outcome = if replaces.is_some() {
                        Outcome::Recreated
                    } else {
                        Outcome::Created
                    };
                    break ResolvedSession {
                        session: Session::start(session_id, event),
                        outcome,
                    };
                }
            };
        };

        match resolved.outcome {
            Outcome::Created => metrics().sessions_created.inc(),
            Outcome::Updated => metrics().sessions_updated.inc(),
            Outcome::Recreated => metrics().sessions_recreated.inc(),
        }

        self.persist(&resolved.session).await?;

        debug!(
            session_id = %resolved.session.session_id,
            outcome = %resolved.outcome,
            total_events = resolved.session.total_events,
            "Session resolved"
        );
        Ok(resolved)
    }

    /// Write the session, then its projection. Both are attempted.
    async fn persist(&self, session: &Session) -> Result<()> {
        let projection = ActiveSessionProjection::from_session(session, self.policy.active_horizon_ms);

        let session_write = self.store.put(&self.tables.sessions, session.to_item()).await;
        let projection_write = self
            .store
            .put(&self.tables.active_sessions, projection.to_item())
            .await;

        session_write.and(projection_write).map_err(|e| {
            metrics().session_persist_errors.inc();
            error!(session_id = %session.session_id, error = %e, "Failed to persist session");
            Error::session_persist(&session.session_id, e.to_string())
        })
    }
}
