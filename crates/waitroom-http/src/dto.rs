//! Request and response bodies.
//!
//! Field names follow the browser client's camelCase JSON.

use serde::{Deserialize, Serialize};
use waitroom_protocol::SessionId;

/// `{ "message": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{ "message": ..., "userId": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessageResponse {
    pub message: String,
    pub user_id: SessionId,
}

impl UserMessageResponse {
    pub fn new(message: impl Into<String>, user_id: SessionId) -> Self {
        Self {
            message: message.into(),
            user_id,
        }
    }
}

/// Body of `POST /refresh-userid-expiration`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Body of `GET /queue-position`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    pub user_id: SessionId,
    /// 0 when admitted, otherwise the 1-based place in line.
    pub position: usize,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
