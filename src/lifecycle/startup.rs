//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the metrics exporter and the admin listener
//! - Bind the gateway listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::error::Error;
use tokio::net::TcpListener;

use crate::admin::setup_admin_router;
use crate::config::GatewayConfig;
use crate::http::server::{AppState, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::metrics;

/// Run the gateway with a validated configuration until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), Box<dyn Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let state = AppState::from_config(config)?;
    let shutdown = Shutdown::new();

    let admin_task = if state.config.admin.enabled {
        let listener = TcpListener::bind(&state.config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(state.clone());
        let mut admin_shutdown = shutdown.subscribe();
        Some(tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        }))
    } else {
        None
    };

    let listener = TcpListener::bind(&state.config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        services = state.pipeline.invokers().len(),
        "Gateway listening"
    );

    let server_shutdown = shutdown.subscribe();
    spawn_signal_handler(shutdown);
    HttpServer::new(state).run(listener, server_shutdown).await?;

    if let Some(task) = admin_task {
        let _ = task.await;
    }
    Ok(())
}
