//! Edge gateway
//!
//! HTTP front door that admits requests and publishes events to a broker.
//! Features:
//! - Path classification into public, protected and default routes
//! - JWT bearer authentication against a shared secret or a JWKS endpoint
//! - Per-client rate limiting keyed by remote address
//! - Audit event and shopping-cart publication to broker bindings
//! - Forward-auth endpoint for reverse proxies with per-prefix role checks

#![allow(missing_docs)]

use anyhow::Result;

pub mod admission;
pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handlers;
pub mod key_resolver;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod publisher;
pub mod rate_limiter;
pub mod role_mapping;
pub mod routes;
pub mod server;

pub use admission::{AdmissionPipeline, RequestContext};
pub use auth::{AuthenticationGate, Principal, TokenOutcome};
pub use config::{
    AuthConfig, BrokerConfig, CorsConfig, GatewayConfig, RateLimitConfig, RoleMappingConfig,
    RoleRule, RouteConfig, ServerConfig,
};
pub use error::GatewayError;
pub use publisher::{EventPublisher, PublishError, SHOPPING_CART_BINDING};
pub use role_mapping::{AccessDenied, RoleMapping};
pub use routes::{RouteClass, RouteClassifier, normalize_path};
pub use server::{AppState, EdgeGatewayServer, create_router};

/// Start the edge gateway server
pub async fn start_server(config: GatewayConfig) -> Result<()> {
    let server = EdgeGatewayServer::new(config).await?;
    server.start().await
}
