//! Middleware for the Waitroom HTTP API.

pub mod admission;
