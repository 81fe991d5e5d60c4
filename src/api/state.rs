//! Application state for the API server

use crate::notifier::Notifier;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// Cycle orchestrator
    pub notifier: Arc<Notifier>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self { notifier }
    }
}
