//! # waitroom-http
//!
//! HTTP API for Waitroom built on Axum.
//!
//! Exposes the waiting room's pull-style endpoints (validate, refresh,
//! position), the operator endpoints (status, reset, dump), a health
//! check, and the admission gate that protects `/app`.
//!
//! Every handler is a thin shell over [`Coordinator`](waitroom_admission::Coordinator);
//! the router never touches queue state directly.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;

/// Name of the cookie carrying a visitor's identity.
pub const USER_ID_COOKIE: &str = "userId";
