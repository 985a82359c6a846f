//! Query parameter parsing for the dashboard views.
//!
//! Unparsable integers fall back to their defaults. Parsed values outside
//! the allowed range are rejected.

use engine_core::limits::{
    DEFAULT_BUCKET_COUNT, DEFAULT_BUCKET_WIDTH_MINUTES, DEFAULT_TOP_PAGES, DEFAULT_WINDOW_HOURS,
    HOUR_MS, MAX_BUCKET_COUNT, MAX_BUCKET_WIDTH_MINUTES, MAX_TOP_N, MAX_WINDOW_HOURS, MINUTE_MS,
};
use engine_core::{Error, Result};

/// Parse an integer, returning `default` when absent or unparsable.
pub fn parse_or_default(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Parse an integer with a fallback default, then check it lies in `[min, max]`.
pub fn bounded(name: &str, raw: Option<&str>, default: i64, min: i64, max: i64) -> Result<i64> {
    let value = parse_or_default(raw, default);
    if value < min || value > max {
        return Err(Error::ParameterOutOfRange {
            name: name.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(value)
}

/// Require a non-blank identifying key.
pub fn required<'a>(name: &str, raw: Option<&'a str>) -> Result<&'a str> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::missing_parameter(name))
}

/// Histogram shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketParams {
    pub count: usize,
    pub width_minutes: i64,
}

impl Default for BucketParams {
    fn default() -> Self {
        Self {
            count: DEFAULT_BUCKET_COUNT as usize,
            width_minutes: DEFAULT_BUCKET_WIDTH_MINUTES,
        }
    }
}

impl BucketParams {
    pub fn parse(bucket_count: Option<&str>, bucket_width: Option<&str>) -> Result<Self> {
        let count = bounded("bucket_count", bucket_count, DEFAULT_BUCKET_COUNT, 1, MAX_BUCKET_COUNT)?;
        let width_minutes = Self::parse_width(bucket_width)?;
        Ok(Self {
            count: count as usize,
            width_minutes,
        })
    }

    pub fn parse_width(bucket_width: Option<&str>) -> Result<i64> {
        bounded(
            "bucket_width",
            bucket_width,
            DEFAULT_BUCKET_WIDTH_MINUTES,
            1,
            MAX_BUCKET_WIDTH_MINUTES,
        )
    }

    pub fn width_ms(&self) -> i64 {
        self.width_minutes * MINUTE_MS
    }
}

/// Look-back window in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    pub hours: i64,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            hours: DEFAULT_WINDOW_HOURS,
        }
    }
}

impl WindowParams {
    pub fn parse(hours: Option<&str>) -> Result<Self> {
        let hours = bounded("hours", hours, DEFAULT_WINDOW_HOURS, 1, MAX_WINDOW_HOURS)?;
        Ok(Self { hours })
    }

    pub fn hours(hours: i64) -> Self {
        Self { hours }
    }

    pub fn span_ms(&self) -> i64 {
        self.hours * HOUR_MS
    }
}

/// Number of ranked rows to return.
pub fn parse_limit(raw: Option<&str>) -> Result<usize> {
    bounded("limit", raw, DEFAULT_TOP_PAGES, 1, MAX_TOP_N).map(|n| n as usize)
}
