//! Broker clients
//!
//! A broker client accepts an opaque payload for a named binding and reports
//! whether the broker took it. Delivery guarantees past that point belong to
//! the broker itself.
//!
//! - [`ChannelBroker`]: in-process bounded queues, one per binding
//! - [`WebhookBroker`]: HTTP bridge that POSTs payloads to a broker endpoint

pub mod channel;
pub mod message;
pub mod webhook;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::BrokerResult;

pub use channel::ChannelBroker;
pub use message::{BrokerMessage, MessageMetadata};
pub use webhook::WebhookBroker;

/// Suffix appended to a broker name to form its outbound binding
pub const OUTPUT_BINDING_SUFFIX: &str = "-out-0";

/// Compose the conventional outbound binding name for a broker
#[must_use]
pub fn output_binding(broker: &str) -> String {
    format!("{broker}{OUTPUT_BINDING_SUFFIX}")
}

/// Client for a message broker
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Attempt a single send of `payload` to `binding`
    async fn try_send(&self, binding: &str, payload: Vec<u8>) -> BrokerResult<()>;

    /// Send `payload` to `binding`, returning whether the broker accepted it
    async fn send(&self, binding: &str, payload: Vec<u8>) -> bool {
        match self.try_send(binding, payload).await {
            Ok(()) => {
                debug!(binding = binding, broker = self.name(), "Broker accepted message");
                true
            }
            Err(e) => {
                warn!(binding = binding, broker = self.name(), error = %e, "Broker rejected message");
                false
            }
        }
    }

    /// Client name for diagnostics
    fn name(&self) -> &str;
}
