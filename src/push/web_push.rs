//! Web Push transport (RFC 8030 / 8291 / 8292) via the `web-push` crate

use super::{PushFailure, PushTransport};
use crate::config::PushConfig;
use crate::error::{Error, Result};
use crate::types::Recipient;
use async_trait::async_trait;
use std::time::Duration;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessage, WebPushMessageBuilder,
};

/// Sends VAPID-signed, encrypted notifications to browser push services
pub struct WebPushTransport {
    client: IsahcWebPushClient,
    vapid_pem: Vec<u8>,
    subject: String,
    ttl: u32,
    timeout: Duration,
}

impl WebPushTransport {
    /// Build the transport from configuration, reading the VAPID key file
    pub fn new(config: &PushConfig) -> Result<Self> {
        let path = config
            .vapid_private_key_path
            .as_ref()
            .ok_or_else(|| Error::Config {
                message: "VAPID private key path is not configured".to_string(),
                key: Some("push.vapid_private_key_path".to_string()),
            })?;

        let pem = std::fs::read(path).map_err(|e| {
            Error::Push(format!(
                "failed to read VAPID key {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_pem(pem, config)
    }

    /// Build the transport from an in-memory PEM private key
    pub fn from_pem(pem: Vec<u8>, config: &PushConfig) -> Result<Self> {
        // Reject a bad key at startup rather than on every send
        VapidSignatureBuilder::from_pem_no_sub(pem.as_slice())
            .map_err(|e| Error::Push(format!("invalid VAPID private key: {}", e)))?;

        let client = IsahcWebPushClient::new()
            .map_err(|e| Error::Push(format!("failed to create push client: {}", e)))?;

        Ok(Self {
            client,
            vapid_pem: pem,
            subject: config.vapid_subject.clone(),
            ttl: config.ttl_secs,
            timeout: config.timeout,
        })
    }

    fn build_message(
        &self,
        recipient: &Recipient,
        payload: &[u8],
    ) -> std::result::Result<WebPushMessage, WebPushError> {
        let subscription = SubscriptionInfo::new(
            &recipient.endpoint,
            &recipient.encryption_key,
            &recipient.auth_secret,
        );

        let mut signature = VapidSignatureBuilder::from_pem(self.vapid_pem.as_slice(), &subscription)?;
        signature.add_claim("sub", self.subject.as_str());
        let signature = signature.build()?;

        let mut builder = WebPushMessageBuilder::new(&subscription);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_ttl(self.ttl);
        builder.set_vapid_signature(signature);
        builder.build()
    }
}

/// Map a `web-push` error onto the status the push service answered with
fn failure_from(error: WebPushError) -> PushFailure {
    match error {
        WebPushError::EndpointNotFound { .. } => PushFailure::with_status(404, error.to_string()),
        WebPushError::EndpointNotValid { .. } => PushFailure::with_status(410, error.to_string()),
        WebPushError::Unauthorized { .. } => PushFailure::with_status(401, error.to_string()),
        WebPushError::BadRequest { .. } => PushFailure::with_status(400, error.to_string()),
        WebPushError::PayloadTooLarge { .. } => PushFailure::with_status(413, error.to_string()),
        other => PushFailure::without_status(other.to_string()),
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(
        &self,
        recipient: &Recipient,
        payload: &[u8],
    ) -> std::result::Result<(), PushFailure> {
        let message = self.build_message(recipient, payload).map_err(failure_from)?;

        match tokio::time::timeout(self.timeout, self.client.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(failure_from(e)),
            Err(_) => Err(PushFailure::without_status(format!(
                "delivery timed out after {:?}",
                self.timeout
            ))),
        }
    }
}
