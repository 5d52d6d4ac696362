//! Prometheus metrics for the edge gateway
//!
//! Metrics covered:
//! - HTTP request metrics (latency, status codes)
//! - Admission decisions per route class
//! - Rate limiting rejections
//! - Publish outcomes per binding
//!
//! With the `monitoring` feature off every recorder is a no-op.

#[cfg(feature = "monitoring")]
use metrics::{counter, describe_counter, describe_histogram, histogram};
#[cfg(feature = "monitoring")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "monitoring")]
use std::sync::Arc;
use tracing::warn;

use crate::routes::RouteClass;

/// Rendering handle for the installed metrics recorder
#[derive(Clone, Default)]
pub struct MetricsHandle {
    #[cfg(feature = "monitoring")]
    inner: Option<Arc<PrometheusHandle>>,
}

impl std::fmt::Debug for MetricsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsHandle")
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl MetricsHandle {
    /// Whether a recorder is installed
    #[must_use]
    pub fn is_installed(&self) -> bool {
        #[cfg(feature = "monitoring")]
        {
            self.inner.is_some()
        }
        #[cfg(not(feature = "monitoring"))]
        {
            false
        }
    }

    /// Render metrics in Prometheus text format
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "monitoring")]
        if let Some(handle) = &self.inner {
            return handle.render();
        }
        String::new()
    }
}

/// Install the global Prometheus recorder
///
/// Installing twice in one process fails; the second call returns an empty
/// handle and logs a warning.
#[must_use]
pub fn install() -> MetricsHandle {
    #[cfg(feature = "monitoring")]
    {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                register_metrics();
                MetricsHandle {
                    inner: Some(Arc::new(handle)),
                }
            }
            Err(e) => {
                warn!("Failed to install metrics recorder: {}", e);
                MetricsHandle::default()
            }
        }
    }
    #[cfg(not(feature = "monitoring"))]
    {
        warn!("Metrics requested but the monitoring feature is disabled");
        MetricsHandle::default()
    }
}

#[cfg(feature = "monitoring")]
fn register_metrics() {
    describe_counter!(
        "edge_gateway_http_requests_total",
        "Total number of HTTP requests by status code"
    );
    describe_histogram!(
        "edge_gateway_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "edge_gateway_admissions_total",
        "Admission decisions by route class and outcome"
    );
    describe_counter!(
        "edge_gateway_publish_total",
        "Publish attempts by binding and result"
    );
    describe_counter!(
        "edge_gateway_diagnostic_errors_total",
        "Dropped authentication diagnostics"
    );
}

/// Record a completed HTTP request
pub fn record_http_request(method: &str, status: u16, duration: f64) {
    #[cfg(feature = "monitoring")]
    {
        counter!("edge_gateway_http_requests_total",
            "method" => method.to_string(),
            "status_code" => status.to_string()
        )
        .increment(1);
        histogram!("edge_gateway_http_request_duration_seconds",
            "method" => method.to_string()
        )
        .record(duration);
    }
    #[cfg(not(feature = "monitoring"))]
    let _ = (method, status, duration);
}

/// Record an admission decision
pub fn record_admission(class: RouteClass, outcome: &'static str) {
    #[cfg(feature = "monitoring")]
    counter!("edge_gateway_admissions_total",
        "class" => class.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    #[cfg(not(feature = "monitoring"))]
    let _ = (class, outcome);
}

/// Record a publish attempt
pub fn record_publish(binding: &str, accepted: bool) {
    #[cfg(feature = "monitoring")]
    counter!("edge_gateway_publish_total",
        "binding" => binding.to_string(),
        "result" => if accepted { "accepted" } else { "failed" }
    )
    .increment(1);
    #[cfg(not(feature = "monitoring"))]
    let _ = (binding, accepted);
}

/// Record a dropped diagnostic
pub fn record_diagnostic_error() {
    #[cfg(feature = "monitoring")]
    counter!("edge_gateway_diagnostic_errors_total").increment(1);
}
