//! Common error types for services

use thiserror::Error;

/// Broker client error types
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No destination is bound under this name
    #[error("Unknown binding: {binding}")]
    UnknownBinding {
        /// Binding name
        binding: String,
    },

    /// Binding queue is at capacity
    #[error("Binding queue full: {binding}")]
    QueueFull {
        /// Binding name
        binding: String,
    },

    /// Consumer side of the binding has gone away
    #[error("Binding closed: {binding}")]
    Closed {
        /// Binding name
        binding: String,
    },

    /// Remote broker answered with a non-success status
    #[error("Broker rejected message on {binding} with status {status}")]
    Status {
        /// Binding name
        binding: String,
        /// HTTP status code
        status: u16,
    },

    /// Transport failure talking to the broker
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid broker configuration
    #[error("Invalid broker configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BrokerError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Transport(format!("timed out: {error}"))
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Result type for broker operations
pub type BrokerResult<T> = std::result::Result<T, BrokerError>;
