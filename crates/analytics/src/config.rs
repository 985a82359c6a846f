//! Analytics configuration.

use std::time::Duration;

use engine_core::limits::{DEFAULT_ACTIVE_SESSION_MINUTES, MINUTE_MS};
use engine_core::{AnonymousUserPolicy, DisplayZone, Error, IngestOptions, ReferrerRule, ReferrerTable, Result};
use serde::{Deserialize, Serialize};

use crate::session_manager::SessionPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Offset of the dashboard's display zone from UTC
    pub display_utc_offset_minutes: i32,
    pub active_session_minutes: i64,
    /// 0 disables the view cache
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    pub scan_timeout_ms: u64,
    /// Maximum items read by one dashboard scan
    pub scan_limit: usize,
    /// Events get an `expires_at` when set
    pub event_ttl_days: Option<u32>,
    pub anonymous_user: AnonymousUserPolicy,
    /// Ordered referrer classification rules; empty means the built-in table
    pub referrers: Vec<ReferrerRule>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            display_utc_offset_minutes: 0,
            active_session_minutes: DEFAULT_ACTIVE_SESSION_MINUTES,
            cache_ttl_secs: 30,
            cache_max_entries: 10_000,
            scan_timeout_ms: 5_000,
            scan_limit: 10_000,
            event_ttl_days: None,
            anonymous_user: AnonymousUserPolicy::Anonymous,
            referrers: Vec::new(),
        }
    }
}

impl AnalyticsConfig {
    pub fn display_zone(&self) -> Result<DisplayZone> {
        DisplayZone::from_offset_minutes(self.display_utc_offset_minutes).ok_or_else(|| {
            Error::internal(format!(
                "display_utc_offset_minutes out of range: {}",
                self.display_utc_offset_minutes
            ))
        })
    }

    pub fn referrer_table(&self) -> ReferrerTable {
        if self.referrers.is_empty() {
            ReferrerTable::default()
        } else {
            ReferrerTable::new(self.referrers.clone())
        }
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            active_horizon_ms: self.active_session_minutes.max(1) * MINUTE_MS,
        }
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            anonymous_user: self.anonymous_user,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms.max(1))
    }
}
