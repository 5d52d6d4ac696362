//! Caller-visible gateway errors and their HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::models::{ApiResponse, ErrorResponse};

/// Message returned when the broker declines a send
pub const SEND_FAILED_MESSAGE: &str = "Failed to send message";

/// Errors surfaced to HTTP callers
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Event could not be converted to its wire format
    #[error("Failed to serialize event: {0}")]
    Serialization(String),

    /// Broker client declined or failed the send
    #[error("Failed to send message")]
    PublishRejected {
        /// Target binding
        binding: String,
    },

    /// Protected path without a valid principal
    #[error("Unauthorized: {reason}")]
    Unauthorized {
        /// Why no principal was available
        reason: String,
    },

    /// Verified principal lacks a role for the forwarded URI
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Which role check failed
        reason: String,
    },

    /// Token could not be checked because the key set is unreachable
    #[error("Failed to retrieve JWKS")]
    TrustSourceUnavailable,

    /// Client exceeded its quota
    #[error("Too many requests - rate limit exceeded")]
    RateLimited {
        /// Rate-limit key of the client
        key: String,
        /// Request path
        path: String,
    },

    /// Endpoint exists but is switched off
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl GatewayError {
    /// HTTP status for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Serialization(_)
            | Self::PublishRejected { .. }
            | Self::TrustSourceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

fn error_envelope(code: &str, message: String, details: FxHashMap<String, String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse::error(ErrorResponse {
        error: code.to_string(),
        message,
        details: (!details.is_empty()).then_some(details),
    }))
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        match self {
            // Publication failures answer in plain text
            Self::Serialization(_) | Self::PublishRejected { .. } | Self::NotImplemented(_) => {
                (status, message).into_response()
            }
            Self::Unauthorized { .. } => (
                status,
                error_envelope("authentication_failed", message, FxHashMap::default()),
            )
                .into_response(),
            Self::Forbidden { .. } => (
                status,
                error_envelope("access_denied", message, FxHashMap::default()),
            )
                .into_response(),
            Self::TrustSourceUnavailable => (
                status,
                error_envelope("trust_source_unavailable", message, FxHashMap::default()),
            )
                .into_response(),
            Self::RateLimited { key, path } => {
                let details = [("client_ip".to_string(), key), ("path".to_string(), path)]
                    .into_iter()
                    .collect();
                (status, error_envelope("rate_limit_exceeded", message, details)).into_response()
            }
        }
    }
}
