//! Health check and monitoring handlers

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::debug;

use crate::{
    models::{ApiResponse, HealthCheckResponse},
    server::AppState,
};

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthCheckResponse>> {
    debug!("Health check request");

    let stats = state.pipeline.limiter().get_stats();
    let health_response = HealthCheckResponse {
        status: "healthy".to_string(),
        broker: state.publisher.broker_name().to_string(),
        rate_limit_keys: stats.tracked_keys,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    Json(ApiResponse::success(health_response))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    if !state.metrics.is_installed() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(state.metrics.render())
}
