//! HTTP bridge to a remote broker
//!
//! Each send is a single `POST {base_url}/{binding}` carrying the payload as
//! the request body. Any 2xx answer counts as acceptance.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use super::{BrokerClient, MessageMetadata};
use crate::errors::{BrokerError, BrokerResult};

/// Header carrying the generated message id
pub const MESSAGE_ID_HEADER: &str = "X-Message-Id";

/// Broker client that forwards payloads over HTTP
pub struct WebhookBroker {
    client: reqwest::Client,
    base_url: String,
}

impl WebhookBroker {
    /// Create a webhook broker with a per-send timeout
    pub fn new(base_url: &str, timeout: Duration) -> BrokerResult<Self> {
        if base_url.is_empty() {
            return Err(BrokerError::Config("webhook base URL is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Destination URL for a binding
    #[must_use]
    pub fn binding_url(&self, binding: &str) -> String {
        format!("{}/{}", self.base_url, binding)
    }
}

#[async_trait]
impl BrokerClient for WebhookBroker {
    async fn try_send(&self, binding: &str, payload: Vec<u8>) -> BrokerResult<()> {
        let metadata = MessageMetadata::default();
        let url = self.binding_url(binding);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, metadata.content_type.as_str())
            .header(MESSAGE_ID_HEADER, metadata.message_id.as_str())
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(message_id = %metadata.message_id, url = %url, "Webhook delivery accepted");
            Ok(())
        } else {
            Err(BrokerError::Status {
                binding: binding.to_string(),
                status: status.as_u16(),
            })
        }
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
