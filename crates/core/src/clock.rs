//! Time utilities: the wall clock, durations and display-zone bucketing.
//!
//! All stored timestamps are UTC milliseconds since the epoch. Conversion to
//! the display zone happens before any flooring or labelling.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::limits::MINUTE_MS;

/// Source of "now" in UTC milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_millis()
    }
}

/// A manually driven clock, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Current UTC time in milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Time elapsed since `last_activity`, clamped to zero.
pub fn duration_ms(last_activity: i64, now: i64) -> i64 {
    now.saturating_sub(last_activity).max(0)
}

/// Format a millisecond duration as `"{m}m {s}s"`.
pub fn format_minutes_seconds(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

/// Time zone used for bucket labels. Fixed UTC offset, no DST rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayZone(FixedOffset);

impl Default for DisplayZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl DisplayZone {
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    /// Zone `minutes` east of UTC. Returns `None` outside ±24h.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self)
    }

    pub fn offset_ms(&self) -> i64 {
        i64::from(self.0.local_minus_utc()) * 1000
    }

    /// Convert a UTC millisecond timestamp into display-zone time.
    pub fn local(&self, ts_ms: i64) -> DateTime<FixedOffset> {
        DateTime::<Utc>::from_timestamp_millis(ts_ms)
            .unwrap_or_default()
            .with_timezone(&self.0)
    }

    /// Floor `ts_ms` to the start of its `width_ms` bucket in local time.
    /// The result is again a UTC millisecond timestamp.
    pub fn floor_ms(&self, ts_ms: i64, width_ms: i64) -> i64 {
        if width_ms <= 0 {
            return ts_ms;
        }
        let local = ts_ms + self.offset_ms();
        local - local.rem_euclid(width_ms) - self.offset_ms()
    }

    /// Floor to a bucket width given in minutes.
    pub fn floor_minutes(&self, ts_ms: i64, width_minutes: i64) -> i64 {
        self.floor_ms(ts_ms, width_minutes * MINUTE_MS)
    }

    pub fn format(&self, ts_ms: i64, fmt: &str) -> String {
        self.local(ts_ms).format(fmt).to_string()
    }

    /// `HH:MM` label used by the histogram buckets.
    pub fn minute_label(&self, ts_ms: i64) -> String {
        self.format(ts_ms, "%H:%M")
    }

    /// `HH:00` label used by the hourly distributions.
    pub fn hour_label(&self, ts_ms: i64) -> String {
        self.format(ts_ms, "%H:00")
    }

    /// `HH:MM:SS`
    pub fn time_label(&self, ts_ms: i64) -> String {
        self.format(ts_ms, "%H:%M:%S")
    }

    /// `MM/DD HH:MM`
    pub fn day_label(&self, ts_ms: i64) -> String {
        self.format(ts_ms, "%m/%d %H:%M")
    }
}
