//! Point-of-sale API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────────────┐
//!                     │                        GATEWAY                            │
//!                     │                                                           │
//!   Client Request    │  ┌─────────┐   ┌─────────────┐   ┌───────────────────┐    │
//!   ──────────────────┼─▶│  http   │──▶│  pipeline   │──▶│ security stages   │    │
//!                     │  │ server  │   │ correlation │   │ authn/authz/limit │    │
//!                     │  └─────────┘   │ + logging   │   └─────────┬─────────┘    │
//!                     │                └─────────────┘             │              │
//!                     │                                            ▼              │
//!                     │                ┌─────────────┐   ┌───────────────────┐    │
//!   Client Response   │                │  routing    │◀──│     dispatch      │    │
//!   ◀─────────────────┼────────────────│  registry   │   └─────────┬─────────┘    │
//!                     │                └─────────────┘             ▼              │
//!                     │                              ┌────────────────────────┐   │   Downstream
//!                     │                              │ resilience: bulkhead → │───┼─▶ Service
//!                     │                              │ retry → breaker → http │   │
//!                     │                              └────────────────────────┘   │
//!                     └───────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use pos_gateway::config::{load_config, validate_config, ConfigError, GatewayConfig};
use pos_gateway::lifecycle::startup;
use pos_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "pos-gateway")]
#[command(about = "API gateway for the point-of-sale services", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let config = GatewayConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        "pos-gateway starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
