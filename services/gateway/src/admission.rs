//! Admission pipeline
//!
//! classify path -> authenticate -> record diagnostic -> reject protected
//! requests without a principal -> resolve rate-limit key -> check quota.
//!
//! The [`RequestContext`] is moved through each stage and comes back extended
//! with what the stage learned. A rejected request never reaches a handler.

use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{AuthenticationGate, Principal, TokenOutcome, bearer_token};
use crate::diagnostics::{self, AuthDiagnostics, TracingDiagnostics};
use crate::error::GatewayError;
use crate::key_resolver::{self, RateLimitKey};
use crate::rate_limiter::RateLimiter;
use crate::routes::{RouteClass, RouteClassifier};

/// Per-request admission state
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path: String,
    remote_addr: Option<SocketAddr>,
    bearer_token: Option<String>,
    route_class: Option<RouteClass>,
    principal: Option<Principal>,
    rate_limit_key: Option<RateLimitKey>,
}

impl RequestContext {
    /// Start a context for `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Capture path, peer address and bearer token from an HTTP request
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        Self::new(request.uri().path())
            .with_remote_addr(key_resolver::remote_addr(request))
            .with_bearer_token(bearer_token(request.headers()).map(str::to_string))
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: Option<SocketAddr>) -> Self {
        self.remote_addr = remote_addr;
        self
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    fn with_route_class(mut self, class: RouteClass) -> Self {
        self.route_class = Some(class);
        self
    }

    fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    fn with_rate_limit_key(mut self, key: Option<RateLimitKey>) -> Self {
        self.rate_limit_key = key;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Route class, set once the request has been classified
    pub fn route_class(&self) -> Option<RouteClass> {
        self.route_class
    }

    /// Validated identity, if any
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn rate_limit_key(&self) -> Option<&RateLimitKey> {
        self.rate_limit_key.as_ref()
    }
}

/// Composes classification, authentication and rate limiting
pub struct AdmissionPipeline {
    classifier: RouteClassifier,
    gate: AuthenticationGate,
    limiter: Arc<RateLimiter>,
    diagnostics: Arc<dyn AuthDiagnostics>,
}

impl std::fmt::Debug for AdmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionPipeline")
            .field("classifier", &self.classifier)
            .field("gate", &self.gate)
            .field("limiter", &"Arc<RateLimiter>")
            .finish()
    }
}

impl AdmissionPipeline {
    pub fn new(classifier: RouteClassifier, gate: AuthenticationGate, limiter: Arc<RateLimiter>) -> Self {
        Self {
            classifier,
            gate,
            limiter,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replace the diagnostic sink
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn AuthDiagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn classifier(&self) -> &RouteClassifier {
        &self.classifier
    }

    pub fn gate(&self) -> &AuthenticationGate {
        &self.gate
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Decide whether a request may proceed to its handler
    pub async fn admit(&self, ctx: RequestContext) -> Result<RequestContext, GatewayError> {
        let class = self.classifier.classify(ctx.path());
        let outcome = self.gate.authenticate(ctx.bearer_token()).await;
        diagnostics::observe(self.diagnostics.as_ref(), ctx.path(), class, &outcome);

        if class.requires_identity() && outcome.principal().is_none() {
            let reason = match &outcome {
                TokenOutcome::Invalid(e) => e.to_string(),
                _ => "Authorization header missing or invalid format".to_string(),
            };
            warn!("Rejected unauthenticated request to {}: {}", ctx.path(), reason);
            crate::metrics::record_admission(class, "unauthorized");
            return Err(GatewayError::Unauthorized { reason });
        }

        let ctx = ctx
            .with_route_class(class)
            .with_principal(outcome.into_principal());

        let key = key_resolver::resolve(ctx.remote_addr());
        if !self.limiter.check(key.as_ref()) {
            crate::metrics::record_admission(class, "rate_limited");
            return Err(GatewayError::RateLimited {
                key: key.map(|k| k.to_string()).unwrap_or_default(),
                path: ctx.path().to_string(),
            });
        }

        debug!(path = ctx.path(), class = %class, "Request admitted");
        crate::metrics::record_admission(class, "admitted");
        Ok(ctx.with_rate_limit_key(key))
    }
}
