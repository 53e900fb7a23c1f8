//! Core protocol types for the waiting room's live channel.
//!
//! Every type here either names a visitor ([`SessionId`]) or is an event
//! that travels over a visitor's WebSocket. The JSON shapes mirror the
//! browser client's event names, so a mismatch in serde attributes means
//! the page stops updating.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The opaque identity a browser claims for itself (its `userId`).
///
/// Waitroom never authenticates this value. The only rule is that it must
/// not be empty: an empty identity is rejected by every operation rather
/// than silently replaced.
///
/// On the wire it is the plain string `"user_x"`. Deserializing goes
/// through [`TryFrom<String>`], so a blank identity is rejected there too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw identity, or returns `None` if it is empty or blank.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Borrows the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwraps the identity into its owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| ProtocolError::InvalidMessage("blank userId".into()))
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Events a browser sends over its live channel.
///
/// `#[serde(tag = "event", content = "data")]` produces "adjacently tagged"
/// JSON in the same shape a socket.io client emits:
///   `{ "event": "joinQueue", "data": { "userId": "user_abc" } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// "Let me in, or tell me where I am in line."
    ///
    /// `user_id` is optional on the wire so that a missing identity can be
    /// answered with an `error` event instead of a decode failure.
    JoinQueue {
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Events the server pushes to a browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Current standing of the visitor.
    ///
    /// `allowed = true, position = 0` means the visitor was admitted and
    /// may proceed to the protected application. Otherwise `position` is
    /// the 1-based rank in the FIFO wait queue.
    QueuePosition { position: usize, allowed: bool },

    /// Something went wrong with the visitor's last request.
    Error { message: String },
}

impl ServerMessage {
    /// The message sent to a visitor who has just been given a slot.
    pub fn admitted() -> Self {
        Self::QueuePosition {
            position: 0,
            allowed: true,
        }
    }

    /// The message sent to a visitor waiting at `position`.
    pub fn waiting(position: usize) -> Self {
        Self::QueuePosition {
            position,
            allowed: false,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
