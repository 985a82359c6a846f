//! Test fixtures and payload builders.

use serde_json::{json, Value};
use uuid::Uuid;

/// A collect payload with only an event type.
pub fn event(event_type: &str) -> Value {
    json!({ "event_type": event_type })
}

/// A page view of `page_url`.
pub fn page_view(page_url: &str) -> Value {
    json!({
        "event_type": "page_view",
        "page_url": page_url,
    })
}

/// A page view arriving from `referrer`.
pub fn page_view_from(page_url: &str, referrer: &str) -> Value {
    json!({
        "event_type": "page_view",
        "page_url": page_url,
        "referrer": referrer,
    })
}

/// An event continuing an existing session.
pub fn in_session(event_type: &str, session_id: &str, page_url: &str) -> Value {
    json!({
        "event_type": event_type,
        "session_id": session_id,
        "page_url": page_url,
    })
}

/// A page view from a distinct visitor.
pub fn visitor_page_view(page_url: &str) -> Value {
    json!({
        "event_type": "page_view",
        "user_id": format!("visitor-{}", Uuid::new_v4().simple()),
        "page_url": page_url,
        "user_agent": "Mozilla/5.0 (Test)",
    })
}

/// A payload larger than the 64KB collect limit.
pub fn oversized_event() -> Value {
    let mut event = page_view("/big");
    event["referrer"] = Value::String("x".repeat(70_000));
    event
}
