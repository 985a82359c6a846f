//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::health;

use crate::response::HealthResponse;
use crate::state::AppState;

/// Check the store and record the result. Returns the failure, if any.
async fn check_store(state: &AppState) -> Result<(), String> {
    match state.store.ping().await {
        Ok(()) => {
            health().store.set_healthy();
            Ok(())
        }
        Err(e) => {
            let msg = e.to_string();
            health().store.set_unhealthy(msg.clone());
            Err(msg)
        }
    }
}

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let check = check_store(&state).await;
    let report = health().report();

    Json(HealthResponse {
        status: report.status,
        store_backend: state.store.backend().to_string(),
        store_connected: check.is_ok(),
        store_error: check.err(),
    })
}

/// GET /health/ready - Readiness check (store reachable).
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    match check_store(&state).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /health/live - Liveness check (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
