//! Route definitions for the Waitroom HTTP API.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The waiting-room endpoints are open; `/app` sits behind the admission
/// gate.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(visitor_routes())
        .merge(operator_routes())
        .merge(gated_routes(state.clone()))
        .route("/health", get(handlers::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Endpoints a visitor's browser calls.
fn visitor_routes() -> Router<AppState> {
    Router::new()
        .route("/validate-userid", get(handlers::session::validate_userid))
        .route(
            "/refresh-userid-expiration",
            post(handlers::session::refresh_userid_expiration),
        )
        .route("/queue-position", get(handlers::session::queue_position))
}

/// Status, reset, and diagnostics.
fn operator_routes() -> Router<AppState> {
    Router::new()
        .route("/queue-status", get(handlers::queue::queue_status))
        .route("/reset-queue", post(handlers::queue::reset_queue))
        .route("/redis-data", get(handlers::queue::redis_data))
}

fn gated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/app", get(handlers::app::welcome))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::admission::require_admission,
        ))
}
