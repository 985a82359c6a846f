//! API routes.

pub mod collect;
pub mod health;
pub mod sessions;
pub mod statistics;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/events/collect", post(collect::collect_handler))
        .route("/api/statistics/hourly", get(statistics::hourly_handler))
        .route("/api/statistics/hourly/details", get(statistics::hour_details_handler))
        .route("/api/statistics/pages", get(statistics::pages_handler))
        .route("/api/statistics/pages/details", get(statistics::page_details_handler))
        .route("/api/statistics/referrers", get(statistics::referrers_handler))
        .route("/api/statistics/referrers/details", get(statistics::referrer_details_handler))
        .route("/api/statistics/summary", get(statistics::summary_handler))
        .route("/api/statistics/sessions", get(statistics::session_stats_handler))
        .route("/api/statistics/realtime", get(statistics::realtime_handler))
        .route("/api/sessions/active", get(sessions::active_handler))
        .route("/api/sessions/:session_id/events", get(sessions::events_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
