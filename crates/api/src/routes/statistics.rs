//! Dashboard statistics endpoints.
//!
//! These always answer 200 with a possibly empty view. Only missing or
//! out-of-range parameters are rejected.

use analytics::aggregate::{
    Bucket, HourDetails, PageCount, PageDetails, Realtime, ReferrerCount, ReferrerDetails,
    SessionStats, Summary,
};
use analytics::params::{self, BucketParams, WindowParams};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::response::ApiError;
use crate::state::AppState;

/// Raw query parameters. Integers stay strings so that unparsable values
/// fall back to their defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub hours: Option<String>,
    pub bucket_count: Option<String>,
    pub bucket_width: Option<String>,
    pub limit: Option<String>,
    pub hour: Option<String>,
    pub page: Option<String>,
    pub referrer: Option<String>,
}

/// GET /api/statistics/hourly
pub async fn hourly_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<Bucket>>, ApiError> {
    let buckets = BucketParams::parse(query.bucket_count.as_deref(), query.bucket_width.as_deref())?;
    let window = WindowParams::parse(query.hours.as_deref())?;
    Ok(Json(state.dashboard().hourly(buckets, window).await))
}

/// GET /api/statistics/pages
pub async fn pages_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<PageCount>>, ApiError> {
    let window = WindowParams::parse(query.hours.as_deref())?;
    let limit = params::parse_limit(query.limit.as_deref())?;
    Ok(Json(state.dashboard().top_pages(window, limit).await))
}

/// GET /api/statistics/referrers
pub async fn referrers_handler(State(state): State<AppState>) -> Json<Vec<ReferrerCount>> {
    Json(state.dashboard().referrers().await)
}

/// GET /api/statistics/summary
pub async fn summary_handler(State(state): State<AppState>) -> Json<Summary> {
    Json(state.dashboard().summary().await)
}

/// GET /api/statistics/sessions
pub async fn session_stats_handler(State(state): State<AppState>) -> Json<SessionStats> {
    Json(state.dashboard().session_stats().await)
}

/// GET /api/statistics/realtime
pub async fn realtime_handler(State(state): State<AppState>) -> Json<Realtime> {
    Json(state.dashboard().realtime().await)
}

/// GET /api/statistics/hourly/details?hour=HH:MM
pub async fn hour_details_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<HourDetails>, ApiError> {
    let hour = params::required("hour", query.hour.as_deref())?;
    let width_minutes = BucketParams::parse_width(query.bucket_width.as_deref())?;
    Ok(Json(state.dashboard().hour_details(hour, width_minutes).await))
}

/// GET /api/statistics/pages/details?page=URL
pub async fn page_details_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<PageDetails>, ApiError> {
    let page = params::required("page", query.page.as_deref())?;
    Ok(Json(state.dashboard().page_details(page).await))
}

/// GET /api/statistics/referrers/details?referrer=LABEL
pub async fn referrer_details_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ReferrerDetails>, ApiError> {
    let referrer = params::required("referrer", query.referrer.as_deref())?;
    Ok(Json(state.dashboard().referrer_details(referrer).await))
}
