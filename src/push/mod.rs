//! Push delivery seam
//!
//! The dispatcher only knows [`PushTransport`]; [`WebPushTransport`] is the
//! production implementation (VAPID-signed, aes128gcm-encrypted Web Push).

use crate::types::Recipient;
use async_trait::async_trait;

mod web_push;

pub use web_push::WebPushTransport;

/// A delivery that did not succeed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushFailure {
    /// Status reported by the push service, if it answered at all
    pub status: Option<u16>,
    /// Description for logs
    pub message: String,
}

impl PushFailure {
    /// Failure with a push service status
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Failure without any status (timeout, connection error, encryption error)
    pub fn without_status(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// How this failure should be treated
    pub fn class(&self) -> FailureClass {
        FailureClass::from_status(self.status)
    }
}

impl std::fmt::Display for PushFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Failure classification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// The subscription is gone for good (404 or 410); the recipient is pruned
    PermanentlyInvalid,
    /// Anything else; logged and kept
    Transient,
}

impl FailureClass {
    /// Classify a push service status
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(404) | Some(410) => FailureClass::PermanentlyInvalid,
            _ => FailureClass::Transient,
        }
    }
}

/// Delivers one encoded message to one recipient
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Send `payload` to `recipient`
    ///
    /// Implementations own the per-delivery timeout.
    async fn send(&self, recipient: &Recipient, payload: &[u8]) -> Result<(), PushFailure>;
}
