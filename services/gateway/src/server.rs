//! Edge gateway server implementation

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use edge_common::{BrokerClient, BrokerMessage, ChannelBroker, WebhookBroker, output_binding};
use std::{net::SocketAddr, sync::Arc, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::{
    admission::AdmissionPipeline,
    auth::AuthenticationGate,
    config::{BrokerConfig, BrokerKind, GatewayConfig},
    handlers::{forward_auth, health_check, initiate_checkout, metrics, publish_audit_event},
    metrics::MetricsHandle,
    middleware::{AdmissionState, admission_middleware, create_cors_layer, logging_middleware},
    publisher::{EventPublisher, SHOPPING_CART_BINDING},
    rate_limiter::RateLimiter,
    role_mapping::RoleMapping,
    routes::RouteClassifier,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub publisher: EventPublisher,
    pub pipeline: Arc<AdmissionPipeline>,
    pub role_mapping: Arc<RoleMapping>,
    pub metrics: MetricsHandle,
    pub checkout_enabled: bool,
    pub start_time: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("publisher", &self.publisher)
            .field("checkout_enabled", &self.checkout_enabled)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Assemble state from configuration and an already-built broker client
    pub fn new(config: &GatewayConfig, broker: Arc<dyn BrokerClient>) -> Result<Self> {
        let gate = AuthenticationGate::from_config(&config.auth)
            .context("Failed to initialise authentication gate")?;
        let limiter = Arc::new(RateLimiter::new(config.rate_limiting.clone()));
        let pipeline = AdmissionPipeline::new(RouteClassifier::new(&config.routes), gate, limiter);

        Ok(Self {
            publisher: EventPublisher::new(broker, &config.broker.default_broker),
            pipeline: Arc::new(pipeline),
            role_mapping: Arc::new(RoleMapping::new(&config.role_mapping)),
            metrics: MetricsHandle::default(),
            checkout_enabled: config.broker.checkout_enabled,
            start_time: Instant::now(),
        })
    }

    /// Replace the admission pipeline
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: AdmissionPipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    /// Attach a metrics handle for the metrics endpoint
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Build the router with all routes and middleware
pub fn create_router(config: &GatewayConfig, state: AppState) -> Router {
    let admission_state = AdmissionState {
        pipeline: Arc::clone(&state.pipeline),
    };

    let mut app = Router::new()
        .route(&config.monitoring.health_path, get(health_check))
        .route(&config.monitoring.metrics_path, get(metrics))
        .route("/auth", get(forward_auth).post(forward_auth))
        .route("/api/v1/audit/events", post(publish_audit_event))
        .route("/api/v1/checkout", post(initiate_checkout))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.timeout_seconds,
        )))
        .layer(middleware::from_fn_with_state(
            admission_state,
            admission_middleware,
        ))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http());

    if config.server.compression {
        app = app.layer(CompressionLayer::new());
    }
    if config.cors.enabled {
        app = app.layer(create_cors_layer(config));
    }

    app
}

/// Build the configured broker client
///
/// The in-memory broker gets a logging consumer per outbound binding so that
/// its queues drain.
pub fn build_broker(config: &BrokerConfig) -> Result<Arc<dyn BrokerClient>> {
    match config.kind {
        BrokerKind::InMemory => {
            let broker = ChannelBroker::new(config.channel_capacity);
            for binding in [output_binding(&config.default_broker), SHOPPING_CART_BINDING.to_string()] {
                spawn_log_consumer(&binding, broker.bind(&binding));
            }
            info!("In-memory broker bound to {:?}", broker.bindings());
            Ok(Arc::new(broker))
        }
        BrokerKind::Webhook => {
            let url = config
                .webhook_url
                .as_deref()
                .context("broker.webhook_url is required for the webhook broker")?;
            let broker = WebhookBroker::new(url, Duration::from_secs(config.timeout_seconds))?;
            info!("Webhook broker targeting {}", url);
            Ok(Arc::new(broker))
        }
    }
}

fn spawn_log_consumer(binding: &str, mut rx: mpsc::Receiver<BrokerMessage>) {
    let binding = binding.to_string();
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            info!(
                binding = %binding,
                message_id = %message.metadata.message_id,
                payload = message.payload_str().unwrap_or("<binary>"),
                "Message delivered"
            );
        }
        debug!("Consumer for {} stopped", binding);
    });
}

/// Edge gateway server
pub struct EdgeGatewayServer {
    config: GatewayConfig,
    state: AppState,
}

impl EdgeGatewayServer {
    /// Create a new edge gateway server
    pub async fn new(config: GatewayConfig) -> Result<Self> {
        info!("Initializing edge gateway server");

        let broker = match build_broker(&config.broker) {
            Ok(broker) => broker,
            Err(e) => {
                error!("Failed to create broker client: {}", e);
                return Err(e);
            }
        };

        let mut state = AppState::new(&config, broker)?;
        if config.monitoring.metrics_enabled {
            state = state.with_metrics(crate::metrics::install());
        }

        info!("Edge gateway server initialized successfully");
        Ok(Self { config, state })
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = match self.config.server_address().parse() {
            Ok(addr) => {
                info!("Parsed server address: {}", addr);
                addr
            }
            Err(e) => {
                error!(
                    "Invalid server address '{}': {}",
                    self.config.server_address(),
                    e
                );
                return Err(anyhow::anyhow!("Invalid server address: {}", e));
            }
        };

        spawn_rate_limit_cleanup(Arc::clone(&self.state.pipeline));

        let app = create_router(&self.config, self.state);
        info!("Starting edge gateway on {}", addr);

        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("TCP listener bound successfully to {}", addr);
                listener
            }
            Err(e) => {
                error!("Failed to bind TCP listener to {}: {}", addr, e);
                return Err(anyhow::anyhow!("Failed to bind to address {}: {}", addr, e));
            }
        };

        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        {
            error!("Server encountered a fatal error: {}", e);
            return Err(anyhow::anyhow!("Server error: {}", e));
        }

        info!("Edge gateway stopped");
        Ok(())
    }
}

fn spawn_rate_limit_cleanup(pipeline: Arc<AdmissionPipeline>) {
    let period = pipeline.limiter().cleanup_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            pipeline.limiter().cleanup_old_limiters();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// API route documentation
pub fn print_routes() {
    println!("Edge Gateway Routes:");
    println!("====================");
    println!();
    println!("Health & Monitoring:");
    println!("  GET  /health                 - Health check");
    println!("  GET  /metrics                - Prometheus metrics");
    println!();
    println!("Forward Auth:");
    println!("  GET|POST /auth               - Reverse-proxy authentication check");
    println!();
    println!("Events:");
    println!("  POST /api/v1/audit/events    - Publish audit event");
    println!("  POST /api/v1/checkout        - Publish shopping cart for checkout");
    println!();
    println!("All endpoints support:");
    println!("- Route classification (public / protected / default)");
    println!("- JWT bearer authentication on protected routes");
    println!("- Role checks per URI prefix on /auth");
    println!("- Per-client rate limiting");
    println!("- CORS");
    println!("- Compression");
    println!("- Request tracing");
}
