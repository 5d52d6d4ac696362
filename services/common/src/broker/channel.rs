//! In-process broker backed by bounded tokio channels

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use super::{BrokerClient, BrokerMessage};
use crate::errors::{BrokerError, BrokerResult};

/// Default per-binding queue capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// In-process broker with one bounded queue per binding
///
/// Sends never wait: a full queue is reported as a rejection.
pub struct ChannelBroker {
    /// Queue capacity for newly bound bindings
    capacity: usize,
    /// Binding name to queue sender
    bindings: RwLock<FxHashMap<String, mpsc::Sender<BrokerMessage>>>,
}

impl ChannelBroker {
    /// Create a broker with the given per-binding capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            bindings: RwLock::new(FxHashMap::default()),
        }
    }

    /// Bind a consumer to `binding`, replacing any previous consumer
    pub fn bind(&self, binding: &str) -> mpsc::Receiver<BrokerMessage> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.bindings.write().insert(binding.to_string(), tx);
        debug!(binding = binding, capacity = self.capacity, "Consumer bound");
        rx
    }

    /// Names of all currently bound bindings
    #[must_use]
    pub fn bindings(&self) -> Vec<String> {
        let mut names: Vec<_> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ChannelBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl BrokerClient for ChannelBroker {
    async fn try_send(&self, binding: &str, payload: Vec<u8>) -> BrokerResult<()> {
        let sender = self
            .bindings
            .read()
            .get(binding)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownBinding {
                binding: binding.to_string(),
            })?;

        sender
            .try_send(BrokerMessage::new(binding, payload))
            .map_err(|e| match e {
                TrySendError::Full(_) => BrokerError::QueueFull {
                    binding: binding.to_string(),
                },
                TrySendError::Closed(_) => BrokerError::Closed {
                    binding: binding.to_string(),
                },
            })
    }

    fn name(&self) -> &str {
        "channel"
    }
}
