//! Event publisher
//!
//! Serializes a domain event to JSON and hands it to the broker client under a
//! binding name. One send attempt per call; retries are left to the caller or
//! the broker client.

use edge_common::{BrokerClient, output_binding};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::error::GatewayError;

/// Binding for shopping-cart checkout events
pub const SHOPPING_CART_BINDING: &str = "shopping-cart-out-0";

/// Publish failures
#[derive(Debug, Error)]
pub enum PublishError {
    /// Event could not be encoded; the broker was not called
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),

    /// Broker client did not accept the payload
    #[error("Broker rejected message on binding {binding}")]
    Rejected {
        /// Target binding
        binding: String,
    },
}

impl From<PublishError> for GatewayError {
    fn from(error: PublishError) -> Self {
        match error {
            PublishError::Serialization(e) => Self::Serialization(e.to_string()),
            PublishError::Rejected { binding } => Self::PublishRejected { binding },
        }
    }
}

/// Publishes domain events to broker bindings
#[derive(Clone)]
pub struct EventPublisher {
    broker: Arc<dyn BrokerClient>,
    default_binding: String,
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("broker", &self.broker.name())
            .field("default_binding", &self.default_binding)
            .finish()
    }
}

impl EventPublisher {
    /// Create a publisher whose default binding is `<default_broker>-out-0`
    pub fn new(broker: Arc<dyn BrokerClient>, default_broker: &str) -> Self {
        Self {
            broker,
            default_binding: output_binding(default_broker),
        }
    }

    /// Binding used for generic events
    #[must_use]
    pub fn default_binding(&self) -> &str {
        &self.default_binding
    }

    /// Name of the underlying broker client
    #[must_use]
    pub fn broker_name(&self) -> &str {
        self.broker.name()
    }

    /// Serialize `event` and send it to `binding`
    pub async fn try_publish<E>(&self, binding: &str, event: &E) -> Result<(), PublishError>
    where
        E: Serialize + Sync + ?Sized,
    {
        let payload = serde_json::to_vec(event).inspect_err(|e| {
            error!("Failed to convert event to JSON! Error: {}", e);
        })?;

        debug!(
            "Publish message: '{}' to '{}'",
            String::from_utf8_lossy(&payload),
            binding
        );

        let accepted = self.broker.send(binding, payload).await;
        crate::metrics::record_publish(binding, accepted);

        if accepted {
            Ok(())
        } else {
            Err(PublishError::Rejected {
                binding: binding.to_string(),
            })
        }
    }

    /// Serialize `event` and send it to `binding`, reporting acceptance
    pub async fn publish<E>(&self, binding: &str, event: &E) -> bool
    where
        E: Serialize + Sync + ?Sized,
    {
        self.try_publish(binding, event).await.is_ok()
    }
}
