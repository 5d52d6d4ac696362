//! Message envelope handed to broker consumers

use serde::{Deserialize, Serialize};

/// Message metadata attached at send time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Message ID
    pub message_id: String,
    /// Source service
    pub source: String,
    /// Send timestamp (nanoseconds since epoch)
    pub timestamp: u64,
    /// Payload content type
    pub content_type: String,
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            source: "edge-gateway".to_string(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                // SAFETY: u128 to u64 - nanoseconds since epoch fits in u64 for centuries
                .as_nanos() as u64,
            content_type: "application/json".to_string(),
        }
    }
}

/// Payload plus the binding it was sent to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerMessage {
    /// Destination binding
    pub binding: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Message metadata
    pub metadata: MessageMetadata,
}

impl BrokerMessage {
    /// Create a message with default metadata
    pub fn new(binding: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            binding: binding.into(),
            payload,
            metadata: MessageMetadata::default(),
        }
    }

    /// Payload as UTF-8 text, if it is valid UTF-8
    #[must_use]
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
