//! Push transport that records deliveries instead of contacting push services

use async_trait::async_trait;
use feed_push::push::PushFailure;
use feed_push::{PushTransport, Recipient};
use std::collections::HashMap;
use std::sync::Mutex;

/// Records payloads per endpoint; scripted endpoints fail with a status
#[derive(Default)]
pub struct RecordingTransport {
    failures: HashMap<String, u16>,
    deliveries: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer deliveries to `endpoint` with `status`
    pub fn failing(mut self, endpoint: &str, status: u16) -> Self {
        self.failures.insert(endpoint.to_string(), status);
        self
    }

    pub fn deliveries(&self) -> Vec<(String, serde_json::Value)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send(&self, recipient: &Recipient, payload: &[u8]) -> Result<(), PushFailure> {
        if let Some(status) = self.failures.get(&recipient.endpoint) {
            return Err(PushFailure::with_status(*status, "push service rejected"));
        }
        let json = serde_json::from_slice(payload).map_err(|e| {
            PushFailure::without_status(format!("payload is not JSON: {}", e))
        })?;
        self.deliveries
            .lock()
            .unwrap()
            .push((recipient.endpoint.clone(), json));
        Ok(())
    }
}
