//! Route handlers for the trigger API
//!
//! Handlers are organized by domain:
//! - [`notify`] - Cycle and test-push triggers
//! - [`system`] - Health, status, latest feed item

use crate::types::PushMessage;
use serde::{Deserialize, Serialize};

mod notify;
mod system;

pub use notify::*;
pub use system::*;

/// Query parameters for /notify-latest
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NotifyQuery {
    /// "1" or "true" to dispatch even if the newest item was already sent
    pub force: Option<String>,
}

/// Optional JSON body for POST /test-push
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TestPushRequest {
    /// Notification title
    pub title: Option<String>,
    /// Notification body
    pub body: Option<String>,
    /// URL opened on click
    pub url: Option<String>,
}

impl TestPushRequest {
    /// Fill missing fields with the stock test message
    pub fn into_message(self) -> PushMessage {
        PushMessage {
            title: self.title.unwrap_or_else(|| "Test notification".to_string()),
            body: self
                .body
                .unwrap_or_else(|| "Push notifications are working".to_string()),
            url: self.url.unwrap_or_else(|| "/".to_string()),
        }
    }
}

/// Accepts `true`, `"1"` and `"true"` as a truthy flag
pub(crate) fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s == "1" || s == "true",
        serde_json::Value::Number(n) => n.as_u64() == Some(1),
        _ => false,
    }
}
