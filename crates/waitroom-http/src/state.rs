//! State shared by every handler and middleware.

use std::sync::Arc;

use waitroom_admission::Coordinator;

/// Cheap to clone: one `Arc` per field.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}
