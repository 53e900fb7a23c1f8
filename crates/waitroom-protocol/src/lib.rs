//! Wire protocol for Waitroom.
//!
//! This crate defines what travels over a client's live channel:
//!
//! - **Identity** ([`SessionId`]): the opaque, client-supplied token that
//!   names a visitor in the waiting room.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): the events a
//!   browser sends (`joinQueue`) and receives (`queuePosition`, `error`).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding or
//!   decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and admission
//! (queue state). It doesn't know about connections or capacity; it only
//! knows how to serialize and deserialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Admission (Coordinator)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, ServerMessage, SessionId};
