//! Route handlers, grouped by audience.

pub mod app;
pub mod health;
pub mod queue;
pub mod session;

use axum_extra::extract::CookieJar;
use waitroom_admission::AdmissionError;
use waitroom_protocol::SessionId;

use crate::USER_ID_COOKIE;

/// The identity in the `userId` cookie, if present and non-empty.
pub(crate) fn cookie_identity(jar: &CookieJar) -> Result<SessionId, AdmissionError> {
    jar.get(USER_ID_COOKIE)
        .and_then(|cookie| SessionId::new(cookie.value()))
        .ok_or(AdmissionError::InvalidIdentity)
}
