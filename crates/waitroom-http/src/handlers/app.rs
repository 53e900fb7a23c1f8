//! The protected application behind the admission gate.

/// GET /app
pub async fn welcome() -> &'static str {
    "Welcome to the Main Application!"
}
