//! Size limits and time windows shared by ingestion and the dashboard views.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated on `RawEvent`. Keep both in sync when modifying.

// === Payload Limits ===

/// Maximum collect payload size in bytes (64KB).
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

// === String Field Limits (chars) ===

/// Page URL max length.
pub const MAX_PAGE_URL_LEN: usize = 2048;

/// Referrer URL max length.
/// Matches HTTP Referer header limit.
pub const MAX_REFERRER_LEN: usize = 2048;

/// User agent string max length.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// Session, user and event ID max length.
pub const MAX_ID_LEN: usize = 128;

// === Time Windows ===

pub const MINUTE_MS: i64 = 60 * 1000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// How far ahead of the server clock a client timestamp may be.
pub const MAX_CLOCK_SKEW_MS: i64 = 15 * MINUTE_MS;

/// Default horizon after which a session is no longer "online now".
pub const DEFAULT_ACTIVE_SESSION_MINUTES: i64 = 30;

/// Default histogram shape: 20 buckets of 5 minutes.
pub const DEFAULT_BUCKET_COUNT: i64 = 20;
pub const DEFAULT_BUCKET_WIDTH_MINUTES: i64 = 5;

/// Allowed histogram shape.
pub const MAX_BUCKET_COUNT: i64 = 288;
pub const MAX_BUCKET_WIDTH_MINUTES: i64 = 24 * 60;

/// Default and maximum look-back for windowed views.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const MAX_WINDOW_HOURS: i64 = 24 * 31;

/// Look-back used by the referrer views (7 days).
pub const REFERRER_WINDOW_HOURS: i64 = 168;

// === Ranking Limits ===

pub const DEFAULT_TOP_PAGES: i64 = 10;
pub const DEFAULT_TOP_REFERRERS: i64 = 5;
pub const MAX_TOP_N: i64 = 100;

/// Rows returned by the detail views.
pub const HOUR_DETAIL_EVENTS: usize = 20;
pub const RECENT_DETAIL_EVENTS: usize = 10;
