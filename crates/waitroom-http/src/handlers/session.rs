//! Per-visitor endpoints: validate, refresh, and position.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum_extra::extract::CookieJar;
use waitroom_admission::{AdmissionError, Standing};
use waitroom_protocol::SessionId;

use super::cookie_identity;
use crate::dto::{PositionResponse, RefreshRequest, UserMessageResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /validate-userid
///
/// Reads the `userId` cookie and reports whether that visitor holds a slot.
/// Read-only: the session's TTL is not touched.
pub async fn validate_userid(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<UserMessageResponse>, ApiError> {
    let user_id = cookie_identity(&jar)?;
    state.coordinator.validate(&user_id).await?;
    Ok(Json(UserMessageResponse::new(
        "userId is valid and active",
        user_id,
    )))
}

/// POST /refresh-userid-expiration
///
/// Body: `{ "userId": "..." }`. A body that is missing or unreadable is
/// treated the same as a missing identity.
pub async fn refresh_userid_expiration(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<UserMessageResponse>, ApiError> {
    let user_id = payload
        .ok()
        .and_then(|Json(body)| body.user_id)
        .and_then(SessionId::new)
        .ok_or(AdmissionError::InvalidIdentity)?;

    match state.coordinator.refresh_activity(&user_id).await {
        Ok(()) => Ok(Json(UserMessageResponse::new(
            "Expiration time refreshed",
            user_id,
        ))),
        Err(AdmissionError::NotActive(user_id)) => Err(ApiError::Denied {
            message: "User is not active",
            user_id,
        }),
        Err(e) => Err(e.into()),
    }
}

/// GET /queue-position
///
/// Pull-style status for a browser that missed a push.
pub async fn queue_position(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<PositionResponse>, ApiError> {
    let user_id = cookie_identity(&jar)?;
    let (position, allowed) = match state.coordinator.position(&user_id).await? {
        Standing::Admitted => (0, true),
        Standing::Waiting { position } => (position, false),
        Standing::Unknown => {
            return Err(ApiError::NotFound {
                message: "userId is not in the queue",
                user_id,
            });
        }
    };
    Ok(Json(PositionResponse {
        user_id,
        position,
        allowed,
    }))
}
