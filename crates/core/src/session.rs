//! Session aggregate and its "online now" projection.

use serde::{Deserialize, Serialize};

use crate::clock::duration_ms;
use crate::event::{Event, EventType};

/// Per-visitor aggregate derived from the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    /// Set once at creation (ms)
    pub start_time: i64,
    /// Newest event time seen (ms)
    pub last_activity: i64,
    pub entry_page: String,
    pub exit_page: String,
    /// Captured at creation only
    pub referrer: String,
    pub total_events: u64,
    pub page_views: u64,
    pub total_clicks: u64,
    /// Always `last_activity - start_time`
    pub session_duration: i64,
    pub is_active: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    /// Create a session from its first event.
    pub fn start(session_id: impl Into<String>, event: &Event) -> Self {
        let mut session = Self {
            session_id: session_id.into(),
            user_id: event.user_id.clone(),
            start_time: event.timestamp,
            last_activity: event.timestamp,
            entry_page: event.page_url.clone(),
            exit_page: event.page_url.clone(),
            referrer: event.referrer.clone(),
            total_events: 1,
            page_views: 0,
            total_clicks: 0,
            session_duration: 0,
            is_active: true,
            ip_address: event.ip_address.clone(),
            user_agent: event.user_agent.clone(),
        };
        session.count(&event.event_type);
        session
    }

    /// Fold a subsequent event into the session.
    ///
    /// Events older than `last_activity` still count, but do not move
    /// `last_activity` backwards or change the exit page.
    pub fn record(&mut self, event: &Event) {
        if event.timestamp >= self.last_activity {
            self.last_activity = event.timestamp;
            self.exit_page = event.page_url.clone();
        }
        self.total_events += 1;
        self.count(&event.event_type);
        self.is_active = true;

        if self.ip_address.is_none() {
            self.ip_address = event.ip_address.clone();
        }
        if self.user_agent.is_none() {
            self.user_agent = event.user_agent.clone();
        }
        self.recompute_duration();
    }

    fn count(&mut self, event_type: &EventType) {
        match event_type {
            EventType::PageView => self.page_views += 1,
            EventType::Click => self.total_clicks += 1,
            _ => {}
        }
    }

    fn recompute_duration(&mut self) {
        self.session_duration = (self.last_activity - self.start_time).max(0);
    }

    /// Whether the last activity is within `horizon_ms` of `now`.
    pub fn is_active_at(&self, now_ms: i64, horizon_ms: i64) -> bool {
        duration_ms(self.last_activity, now_ms) <= horizon_ms
    }

    /// Bounced sessions saw at most one page view.
    pub fn is_bounce(&self) -> bool {
        self.page_views <= 1
    }
}

/// Short-lived denormalized view of a session used by "online now" queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSessionProjection {
    pub session_id: String,
    pub user_id: String,
    pub last_activity: i64,
    pub current_page: String,
    /// Absolute expiry time (ms)
    pub expires_at: i64,
}

impl ActiveSessionProjection {
    pub fn from_session(session: &Session, horizon_ms: i64) -> Self {
        Self {
            session_id: session.session_id.clone(),
            user_id: session.user_id.clone(),
            last_activity: session.last_activity,
            current_page: session.exit_page.clone(),
            expires_at: session.last_activity.saturating_add(horizon_ms),
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}
