//! Session endpoints.

use analytics::aggregate::ActiveSessionView;
use analytics::params;
use axum::{
    extract::{Path, State},
    Json,
};
use engine_core::Event;

use crate::response::ApiError;
use crate::state::AppState;

/// GET /api/sessions/active - Sessions online now, most recent first.
pub async fn active_handler(State(state): State<AppState>) -> Json<Vec<ActiveSessionView>> {
    Json(state.dashboard().active_sessions().await)
}

/// GET /api/sessions/:session_id/events - Events of one session in time order.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let session_id = params::required("session_id", Some(&session_id))?;
    Ok(Json(state.dashboard().session_events(session_id).await))
}
