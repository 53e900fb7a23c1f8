//! Maps admission failures to HTTP responses.
//!
//! | Error                | Status | Body                      |
//! |----------------------|--------|---------------------------|
//! | invalid identity     | 400    | `{message}`               |
//! | not active / denied  | 403    | `{message, userId}`       |
//! | unknown identity     | 404    | `{message, userId}`       |
//! | store unavailable    | 503    | `{message}`               |
//! | promotion race       | 500    | `{message}`               |

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use waitroom_admission::AdmissionError;
use waitroom_protocol::SessionId;

use crate::dto::{MessageResponse, UserMessageResponse};

/// Errors returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A request-specific denial, e.g. "User is not active".
    #[error("{message}")]
    Denied {
        message: &'static str,
        user_id: SessionId,
    },

    #[error("{message}")]
    NotFound {
        message: &'static str,
        user_id: SessionId,
    },

    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Denied { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Admission(e) => match e {
                AdmissionError::InvalidIdentity => StatusCode::BAD_REQUEST,
                AdmissionError::NotActive(_) => StatusCode::FORBIDDEN,
                AdmissionError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                AdmissionError::PromotionRace(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Denied { message, user_id } | Self::NotFound { message, user_id } => {
                (status, Json(UserMessageResponse::new(message, user_id))).into_response()
            }
            Self::Admission(AdmissionError::NotActive(user_id)) => (
                status,
                Json(UserMessageResponse::new("userId is not active", user_id)),
            )
                .into_response(),
            Self::Admission(e) => {
                if status.is_server_error() {
                    tracing::error!(error = %e, "request failed");
                }
                (status, Json(MessageResponse::new(e.to_string()))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(raw: &str) -> SessionId {
        SessionId::new(raw).unwrap()
    }

    #[test]
    fn test_status_maps_every_admission_error() {
        let cases = [
            (AdmissionError::InvalidIdentity, StatusCode::BAD_REQUEST),
            (AdmissionError::NotActive(sid("a")), StatusCode::FORBIDDEN),
            (
                AdmissionError::StoreUnavailable("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AdmissionError::PromotionRace(sid("a")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_denied_is_forbidden() {
        let err = ApiError::Denied {
            message: "User is not active",
            user_id: sid("a"),
        };
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "User is not active");
    }

    #[test]
    fn test_invalid_identity_message_is_client_facing() {
        let err = ApiError::from(AdmissionError::InvalidIdentity);
        assert_eq!(err.to_string(), "Invalid userId");
    }
}
