//! Forward-auth check for reverse proxies
//!
//! The proxy calls `/auth` with the original URI in `X-Forwarded-Uri` and the
//! caller's `Authorization` header. A 2xx answer lets the request through.
//!
//! The forwarded path is percent-decoded and dot segments are resolved before
//! any public check, so `/public/../api` is judged as `/api`. A path that
//! cannot be normalized is never public and matches no role rule.

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
};
use tracing::{debug, error, info, warn};

use crate::{
    auth::{TokenError, TokenOutcome, bearer_token},
    error::GatewayError,
    models::ForwardAuthResponse,
    routes::{RouteClass, normalize_path},
    server::AppState,
};

/// Header carrying the URI the proxy is asking about
pub const FORWARDED_URI_HEADER: &str = "X-Forwarded-Uri";

const MISSING_BEARER: &str = "Missing or malformed Authorization header";

/// `GET|POST /auth`
pub async fn forward_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ForwardAuthResponse>, GatewayError> {
    let forwarded_uri = headers
        .get(FORWARDED_URI_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("/");
    // Query strings do not take part in classification
    let forwarded_path = forwarded_uri.split('?').next().unwrap_or(forwarded_uri);
    debug!("Received request on forwarded URI: {}", forwarded_uri);

    let normalized = normalize_path(forwarded_path);
    if normalized.is_none() {
        warn!("Forwarded path {} does not normalize, treating as non-public", forwarded_path);
    }

    let public = normalized.as_deref().is_some_and(|path| {
        state.pipeline.classifier().classify(path) == RouteClass::Public
            || state.role_mapping.is_public(path)
    });
    if public {
        info!("Public access granted to: {}", forwarded_uri);
        return Ok(Json(ForwardAuthResponse {
            message: "Public access granted".to_string(),
            user_id: None,
            roles: Vec::new(),
        }));
    }

    let Some(token) = bearer_token(&headers) else {
        return Err(GatewayError::Unauthorized {
            reason: MISSING_BEARER.to_string(),
        });
    };

    let principal = match state.pipeline.gate().authenticate(Some(token)).await {
        TokenOutcome::Valid(principal) => principal,
        TokenOutcome::Invalid(TokenError::TrustSource(e)) => {
            error!("Cannot verify token for {}: {}", forwarded_uri, e);
            return Err(GatewayError::TrustSourceUnavailable);
        }
        TokenOutcome::Invalid(e) => {
            return Err(GatewayError::Unauthorized {
                reason: e.to_string(),
            });
        }
        TokenOutcome::NoToken => {
            return Err(GatewayError::Unauthorized {
                reason: MISSING_BEARER.to_string(),
            });
        }
    };

    let access = state
        .role_mapping
        .authorize(normalized.as_deref(), forwarded_path, &principal.roles);
    if let Err(denied) = access {
        warn!(
            "Access denied to user {} for path {}: {}",
            principal.subject, forwarded_uri, denied
        );
        return Err(GatewayError::Forbidden {
            reason: denied.to_string(),
        });
    }

    info!(
        "Access granted to user {} for path {}",
        principal.subject, forwarded_uri
    );
    Ok(Json(ForwardAuthResponse {
        message: "Authentication successful".to_string(),
        user_id: Some(principal.subject),
        roles: principal.roles,
    }))
}
