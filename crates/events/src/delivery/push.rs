//! Push notification delivery via an external gateway.
//!
//! The platform does not speak Web Push itself; it POSTs the notification
//! payload to a configured gateway which owns the vendor specifics. One
//! request is made per registered device fingerprint.

use relay_db::models::device::Device;
use relay_db::models::notification::Notification;

/// Error type for push delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The gateway was unreachable or the request failed outright.
    #[error("Push gateway request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("Push gateway rejected delivery: HTTP {0}")]
    Rejected(u16),
}

/// Configuration for the push gateway channel.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Gateway endpoint receiving the notification payloads.
    pub gateway_url: String,
}

impl PushConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `PUSH_GATEWAY_URL` is not set, signalling that the
    /// push channel is disabled.
    pub fn from_env() -> Option<Self> {
        let gateway_url = std::env::var("PUSH_GATEWAY_URL").ok()?;
        Some(Self { gateway_url })
    }
}

/// Sends push notifications through the configured gateway.
pub struct PushDelivery {
    client: reqwest::Client,
    config: PushConfig,
}

impl PushDelivery {
    /// Create a new push delivery channel with the given configuration.
    pub fn new(config: PushConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Deliver a notification to one registered device.
    pub async fn deliver(
        &self,
        device: &Device,
        notification: &Notification,
    ) -> Result<(), PushError> {
        let body = serde_json::json!({
            "device": device.fingerprint,
            "kind": notification.kind,
            "title": notification.title,
            "body": notification.body,
            "link": notification.link,
            "payload": notification.payload,
        });

        let response = self
            .client
            .post(&self.config.gateway_url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PushError::Rejected(response.status().as_u16()));
        }

        tracing::info!(
            device_id = device.id,
            kind = %notification.kind,
            "Push notification delivered"
        );
        Ok(())
    }
}
