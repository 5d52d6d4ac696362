//! REST API models and request/response types

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Audit event republished on the default binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier
    pub id: String,
    /// Action that was performed (e.g., "login")
    pub action: String,
    /// Who performed the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// What the action was performed on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// When the action happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-form event attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Shopping cart submitted for checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingCart {
    /// Cart identifier
    pub id: String,
    /// Owning customer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// ISO 4217 currency code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Cart lines
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// A single cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier
    pub product_id: String,
    /// Units ordered
    pub quantity: u32,
    /// Unit price as decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<String>,
}

/// Forward-auth check result
#[derive(Debug, Serialize, Deserialize)]
pub struct ForwardAuthResponse {
    /// Human-readable decision
    pub message: String,
    /// Subject of the validated token
    pub user_id: Option<String>,
    /// Roles carried by the token
    pub roles: Vec<String>,
}

/// Error response model
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details
    pub details: Option<FxHashMap<String, String>>,
}

/// Generic API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
    /// Error details (if failed)
    pub error: Option<ErrorResponse>,
    /// Response timestamp
    pub timestamp: i64,
}

impl<T> ApiResponse<T> {
    /// Create a successful API response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Create an error API response
    #[must_use]
    pub fn error(error: ErrorResponse) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Broker client in use
    pub broker: String,
    /// Tracked rate-limit keys
    pub rate_limit_keys: usize,
    /// Service version
    pub version: String,
    /// Service uptime in seconds
    pub uptime_seconds: u64,
}
