//! Middleware for admission, request logging and CORS

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, trace, warn};

use crate::admission::{AdmissionPipeline, RequestContext};
use crate::config::GatewayConfig;
use crate::key_resolver;

/// Admission middleware state
#[derive(Clone)]
pub struct AdmissionState {
    pub pipeline: Arc<AdmissionPipeline>,
}

impl std::fmt::Debug for AdmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionState")
            .field("pipeline", &"Arc<AdmissionPipeline>")
            .finish()
    }
}

/// Run the admission pipeline before the handler
///
/// On success the validated principal, if any, and the final request context
/// are placed in the request extensions.
pub async fn admission_middleware(
    State(state): State<AdmissionState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ctx = RequestContext::from_request(&request);

    match state.pipeline.admit(ctx).await {
        Ok(ctx) => {
            if let Some(principal) = ctx.principal() {
                request.extensions_mut().insert(principal.clone());
            }
            request.extensions_mut().insert(ctx);
            Ok(next.run(request).await)
        }
        Err(e) => {
            warn!(
                "Request to {} rejected from {}: {}",
                request.uri().path(),
                client_ip(&request),
                e
            );
            Err(e.into_response())
        }
    }
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = client_ip(&request);

    trace!("Incoming request path: {}", uri.path());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = duration.as_millis(),
        client_ip = %client_ip,
        "Request processed"
    );
    crate::metrics::record_http_request(method.as_str(), status.as_u16(), duration.as_secs_f64());

    response
}

/// CORS layer factory
pub fn create_cors_layer(config: &GatewayConfig) -> CorsLayer {
    let wildcard = config.cors.allowed_origins.iter().any(|origin| origin == "*");

    // tower-http refuses credentials together with a wildcard origin
    let allow_credentials = config.cors.allow_credentials && !wildcard;
    if config.cors.allow_credentials && wildcard {
        warn!("CORS credentials ignored because allowed_origins contains \"*\"");
    }

    let mut cors = CorsLayer::new()
        .allow_credentials(allow_credentials)
        .max_age(std::time::Duration::from_secs(config.cors.max_age_seconds));

    if wildcard {
        cors = cors.allow_origin(tower_http::cors::Any);
    } else {
        let origins: Vec<HeaderValue> = config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Result<Vec<_>, _> = config
        .cors
        .allowed_methods
        .iter()
        .map(|method| method.parse())
        .collect();

    if let Ok(methods) = methods {
        cors = cors.allow_methods(methods);
    }

    let headers: Result<Vec<_>, _> = config
        .cors
        .allowed_headers
        .iter()
        .map(|header| header.parse())
        .collect();

    if let Ok(headers) = headers {
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Peer address for log lines
fn client_ip(request: &Request) -> String {
    key_resolver::remote_addr(request)
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
