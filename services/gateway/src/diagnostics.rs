//! Best-effort authentication diagnostics
//!
//! Every request records its path and authentication outcome. Recording is
//! advisory: errors from a sink are logged and discarded by [`observe`] and
//! never reach the admission decision.

use thiserror::Error;
use tracing::{debug, trace};

use crate::auth::TokenOutcome;
use crate::routes::RouteClass;

/// Failure while emitting observability data
#[derive(Debug, Error)]
#[error("Diagnostic sink error: {0}")]
pub struct DiagnosticSinkError(pub String);

/// Destination for authentication outcome records
pub trait AuthDiagnostics: Send + Sync {
    fn record(
        &self,
        path: &str,
        class: RouteClass,
        outcome: &TokenOutcome,
    ) -> Result<(), DiagnosticSinkError>;
}

/// Writes outcome records as trace-level events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl AuthDiagnostics for TracingDiagnostics {
    fn record(
        &self,
        path: &str,
        class: RouteClass,
        outcome: &TokenOutcome,
    ) -> Result<(), DiagnosticSinkError> {
        trace!(route_class = %class, "Authentication result for path {}: {}", path, outcome);
        Ok(())
    }
}

/// Record an outcome, swallowing any sink failure
pub fn observe(sink: &dyn AuthDiagnostics, path: &str, class: RouteClass, outcome: &TokenOutcome) {
    if let Err(e) = sink.record(path, class, outcome) {
        debug!("Dropped authentication diagnostic for {}: {}", path, e);
        crate::metrics::record_diagnostic_error();
    }
}
