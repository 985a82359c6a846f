//! Canonical event records and ingestion of raw collect payloads.
//!
//! This module handles:
//! - Parsing the raw JSON object sent by the browser
//! - Validating field limits and the event type
//! - Applying defaults and extracting client metadata from the transport

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::error::{Error, Result};
use crate::ids;
use crate::limits::MAX_CLOCK_SKEW_MS;

/// Event type. Only the first four are accepted at ingestion; anything else
/// read back from storage is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    PageView,
    Click,
    Scroll,
    FormSubmit,
    Other(String),
}

impl EventType {
    /// Wire names of the types accepted at ingestion.
    pub const RECOGNIZED: [&'static str; 4] = ["page_view", "click", "scroll", "form_submit"];

    /// Type name counted by the conversion rate.
    pub const CONVERSION: &'static str = "conversion";

    pub fn as_str(&self) -> &str {
        match self {
            Self::PageView => "page_view",
            Self::Click => "click",
            Self::Scroll => "scroll",
            Self::FormSubmit => "form_submit",
            Self::Other(name) => name,
        }
    }

    /// Parse an ingested type, rejecting anything outside [`Self::RECOGNIZED`].
    pub fn parse_recognized(value: &str) -> Result<Self> {
        match Self::from_stored(value) {
            Self::Other(_) => Err(Error::InvalidEventType {
                value: value.to_string(),
                allowed: Self::RECOGNIZED.to_vec(),
            }),
            known => Ok(known),
        }
    }

    /// Parse a stored type. Never fails.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "page_view" => Self::PageView,
            "click" => Self::Click,
            "scroll" => Self::Scroll,
            "form_submit" => Self::FormSubmit,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_page_view(&self) -> bool {
        matches!(self, Self::PageView)
    }

    pub fn is_click(&self) -> bool {
        matches!(self, Self::Click)
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Other(name) if name == Self::CONVERSION)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        Self::from_stored(&value)
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

/// An immutable, canonical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    /// Milliseconds since epoch, UTC
    pub timestamp: i64,
    pub user_id: String,
    /// Assigned by the session manager when absent
    pub session_id: Option<String>,
    pub event_type: EventType,
    pub page_url: String,
    pub referrer: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl Event {
    /// Copy of this event stamped with a resolved session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Collect payload as sent by the browser.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RawEvent {
    /// Required, checked against the recognized set after validation
    pub event_type: String,

    #[validate(length(max = 128))]
    pub session_id: Option<String>,

    #[validate(length(max = 128))]
    pub user_id: Option<String>,

    #[validate(length(max = 2048))]
    pub page_url: Option<String>,

    #[validate(length(max = 2048))]
    pub referrer: Option<String>,

    #[validate(length(max = 512))]
    pub user_agent: Option<String>,

    /// Upstream-assigned id, generated when absent
    #[validate(length(max = 128))]
    pub event_id: Option<String>,

    /// Upstream-assigned time in ms, defaults to receive time
    pub timestamp: Option<i64>,
}

/// Client metadata taken from the HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportContext {
    /// Raw `X-Forwarded-For` header
    pub forwarded_for: Option<String>,
    /// Raw `X-Real-IP` header
    pub real_ip: Option<String>,
    /// Peer address of the connection
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
}

impl TransportContext {
    /// Client IP: first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer address.
    pub fn client_ip(&self) -> Option<String> {
        let forwarded = self
            .forwarded_for
            .as_deref()
            .and_then(|v| v.split(',').next())
            .map(str::trim);
        let real_ip = self.real_ip.as_deref().map(str::trim);
        let remote = self.remote_addr.as_deref().map(str::trim);

        [forwarded, real_ip, remote]
            .into_iter()
            .flatten()
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// What to record as `user_id` when the payload carries none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymousUserPolicy {
    /// The literal `"anonymous"`
    #[default]
    Anonymous,
    /// A generated pseudo-id per event
    Generated,
}

/// Ingestion policy knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    pub anonymous_user: AnonymousUserPolicy,
}

pub const ANONYMOUS_USER: &str = "anonymous";

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate and normalize a raw collect payload into an [`Event`].
pub fn ingest(
    payload: &[u8],
    ctx: &TransportContext,
    now_ms: i64,
    opts: &IngestOptions,
) -> Result<Event> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| Error::malformed(format!("invalid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(Error::malformed("request body must be a JSON object"));
    }

    let raw: RawEvent = serde_json::from_value(value)
        .map_err(|e| Error::malformed(format!("invalid event: {}", e)))?;

    raw.validate()
        .map_err(|e| Error::malformed(format!("{}", e)))?;

    let event_type = EventType::parse_recognized(raw.event_type.trim())?;

    let user_id = non_empty(raw.user_id).unwrap_or_else(|| match opts.anonymous_user {
        AnonymousUserPolicy::Anonymous => ANONYMOUS_USER.to_string(),
        AnonymousUserPolicy::Generated => ids::generate_user_id(now_ms),
    });

    let timestamp = raw.timestamp.filter(|ts| *ts > 0).unwrap_or(now_ms);
    if timestamp > now_ms.saturating_add(MAX_CLOCK_SKEW_MS) {
        return Err(Error::malformed(format!(
            "timestamp {} is more than {}s ahead of server time",
            timestamp,
            MAX_CLOCK_SKEW_MS / 1000
        )));
    }

    Ok(Event {
        event_id: non_empty(raw.event_id).unwrap_or_else(|| ids::generate_event_id(now_ms)),
        timestamp,
        user_id,
        session_id: non_empty(raw.session_id),
        event_type,
        page_url: raw.page_url.unwrap_or_default(),
        referrer: raw.referrer.unwrap_or_default(),
        user_agent: non_empty(raw.user_agent).or_else(|| non_empty(ctx.user_agent.clone())),
        ip_address: ctx.client_ip(),
    })
}
