//! Identifier generation.
//!
//! IDs are time-prefixed with a random suffix. Collisions are not detected.

use chrono::{DateTime, Utc};
use uuid::Uuid;

fn utc(now_ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(now_ms).unwrap_or_default()
}

fn random_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}

/// `evt_YYYYMMDD_HHMMSS_<12 hex>`
pub fn generate_event_id(now_ms: i64) -> String {
    format!(
        "evt_{}_{}",
        utc(now_ms).format("%Y%m%d_%H%M%S"),
        random_hex(12)
    )
}

/// `sess_YYYYMMDD_<user prefix>_<12 hex>`, where the prefix is up to eight
/// alphanumeric characters of the user id.
pub fn generate_session_id(now_ms: i64, user_id: &str) -> String {
    let prefix: String = user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    let prefix = if prefix.is_empty() { "anon".to_string() } else { prefix };
    format!(
        "sess_{}_{}_{}",
        utc(now_ms).format("%Y%m%d"),
        prefix,
        random_hex(12)
    )
}

/// Pseudo user id for visitors that did not identify themselves.
pub fn generate_user_id(now_ms: i64) -> String {
    format!("anon_{}_{}", now_ms.div_euclid(1000), random_hex(8))
}
