//! Admission gate: only admitted visitors reach the protected routes.
//!
//! Each request through the gate counts as activity. The visitor's TTL is
//! refreshed and the `userId` cookie re-issued with a fresh `Max-Age`, so
//! a visitor who keeps browsing keeps their slot. Anyone else is sent back
//! to the waiting room at `/`.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use waitroom_protocol::SessionId;

use crate::USER_ID_COOKIE;
use crate::handlers::cookie_identity;
use crate::state::AppState;

/// Lets admitted visitors through, redirecting everyone else to `/`.
pub async fn require_admission(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let user_id = match cookie_identity(&jar) {
        Ok(user_id) => user_id,
        Err(_) => return Redirect::to("/").into_response(),
    };

    // A refresh only succeeds for a visitor holding a slot.
    let coordinator = &state.coordinator;
    if let Err(e) = coordinator.refresh_activity(&user_id).await {
        tracing::debug!(session_id = %user_id, error = %e, "gate denied, redirecting");
        return Redirect::to("/").into_response();
    }

    let jar = jar.add(session_cookie(user_id, coordinator.session_ttl()));
    (jar, next.run(request).await).into_response()
}

/// The `userId` cookie, valid for one session TTL.
fn session_cookie(user_id: SessionId, ttl: Duration) -> Cookie<'static> {
    Cookie::build((USER_ID_COOKIE, user_id.into_inner()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}
