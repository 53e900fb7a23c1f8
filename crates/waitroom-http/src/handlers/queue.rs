//! Operator endpoints: status, reset, and the full dump.

use axum::Json;
use axum::extract::State;
use waitroom_admission::{QueueStatus, StoreDump};

use crate::dto::MessageResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /queue-status
pub async fn queue_status(State(state): State<AppState>) -> Result<Json<QueueStatus>, ApiError> {
    Ok(Json(state.coordinator.status().await?))
}

/// POST /reset-queue
pub async fn reset_queue(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    state.coordinator.reset().await?;
    Ok(Json(MessageResponse::new("Queue and active users reset.")))
}

/// GET /redis-data
///
/// The path predates the in-process store; clients still call it by this
/// name.
pub async fn redis_data(State(state): State<AppState>) -> Result<Json<StoreDump>, ApiError> {
    Ok(Json(state.coordinator.dump().await?))
}
