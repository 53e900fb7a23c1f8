//! Unified error type for the Waitroom server.

use waitroom_admission::AdmissionError;
use waitroom_protocol::ProtocolError;
use waitroom_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WaitroomError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An admission-level error (invalid identity, store unavailable).
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP listener failed to bind or serve.
    #[error("http server: {0}")]
    Http(#[from] std::io::Error),
}
