//! Event collection endpoint.

use axum::{body::Bytes, extract::State, Json};
use engine_core::{limits::MAX_PAYLOAD_BYTES, Error};
use tracing::{debug, info};

use crate::extractors::ClientContext;
use crate::response::{ApiError, CollectResponse};
use crate::state::AppState;

/// POST /api/events/collect - Ingest one browser event.
///
/// Succeeds once the event is stored, even if its session could not be
/// persisted.
pub async fn collect_handler(
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    body: Bytes,
) -> Result<Json<CollectResponse>, ApiError> {
    if body.len() > MAX_PAYLOAD_BYTES {
        return Err(Error::malformed(format!(
            "payload size {}KB exceeds {}KB limit",
            body.len() / 1024,
            MAX_PAYLOAD_BYTES / 1024
        ))
        .into());
    }

    debug!(payload_size = body.len(), "Received event");

    let receipt = state.collector().accept(&body, &ctx).await?;

    if !receipt.session_persisted {
        info!(
            event_id = %receipt.event_id,
            session_id = %receipt.session_id,
            "Event stored without session update"
        );
    }

    Ok(Json(CollectResponse {
        event_id: receipt.event_id,
        session_id: receipt.session_id,
    }))
}
