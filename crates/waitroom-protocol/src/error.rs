//! Error types for the protocol layer.
//!
//! Each crate in Waitroom defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in serialization, not in
//! networking or queue management.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `event` name, or a
    /// `data` object of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but is invalid at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
