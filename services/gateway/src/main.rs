//! Edge Gateway - Main Entry Point

use anyhow::Result;
use clap::{Arg, Command};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_gateway::{GatewayConfig, start_server};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_gateway=info,edge_common=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let matches = Command::new("edge-gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Edge gateway: request admission and event publication")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("gateway.toml"),
        )
        .arg(
            Arg::new("routes")
                .long("routes")
                .help("Print available routes and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("routes") {
        edge_gateway::server::print_routes();
        return Ok(());
    }

    let default_config = "gateway.toml".to_string();
    let config_path = matches
        .get_one::<String>("config")
        .unwrap_or(&default_config);
    if Path::new(config_path).exists() {
        info!("Loading configuration from: {}", config_path);
    } else {
        warn!(
            "Config file {} not found, using defaults and environment overrides",
            config_path
        );
    }
    let config = match GatewayConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration ({}): {:#}", config_path, e);
            std::process::exit(1);
        }
    };

    info!("Starting Edge Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Server will bind to: {}", config.server_address());
    info!("Trust source: {:?}", config.auth.trust_source);
    info!(
        "Broker: {:?} (default binding {}-out-0)",
        config.broker.kind, config.broker.default_broker
    );

    info!("Features enabled:");
    info!("  CORS: {}", config.cors.enabled);
    info!("  Rate Limiting: {}", config.rate_limiting.enabled);
    info!("  Metrics: {}", config.monitoring.metrics_enabled);
    info!("  Compression: {}", config.server.compression);
    info!("  Checkout: {}", config.broker.checkout_enabled);

    if let Err(e) = start_server(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
