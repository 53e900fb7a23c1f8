//! # Waitroom
//!
//! A waiting room in front of a capacity-limited application.
//!
//! Visitors connect over a WebSocket and ask to join. While there is room
//! they are admitted straight away; otherwise they wait in a strict FIFO
//! line and are told their position every time it changes. Admitted
//! sessions expire unless refreshed, and a background sweep hands each
//! freed slot to the head of the line.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waitroom::prelude::*;
//!
//! # async fn start() -> Result<(), WaitroomError> {
//! let config = WaitroomConfig::load()?;
//! let server = WaitroomServer::builder()
//!     .config(&config)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod logging;
mod server;

pub use crate::config::{ConfigError, WaitroomConfig};
pub use error::WaitroomError;
pub use server::{WaitroomServer, WaitroomServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{ConfigError, WaitroomConfig, WaitroomError, WaitroomServer, WaitroomServerBuilder};
    pub use waitroom_admission::{AdmissionConfig, Coordinator, JoinOutcome, Standing};
    pub use waitroom_protocol::{ClientMessage, ServerMessage, SessionId};
}
