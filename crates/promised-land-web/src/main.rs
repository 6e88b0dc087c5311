//! Promised Land web server

#![forbid(unsafe_code)]

use clap::Parser;
use promised_land_core::{Config, context_error, context_error::Result, init_logging};
use promised_land_web::{AppState, build_router};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Command line interface for the Promised Land web server
#[derive(Parser)]
#[command(
    name = "promised-land-server",
    version = env!("CARGO_PKG_VERSION"),
    about = "Landing page and admin back office for the Promised Land school"
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "PROMISED_LAND_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    host: Option<String>,

    /// Override the port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::load_from(cli.config.as_deref())
        .map_err(|e| context_error!("Failed to load configuration: {}", e))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_logging(&config.logging)?;
    if let Err(e) = dotenv {
        info!("No .env file loaded: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        store = ?config.backend.store,
        "Starting Promised Land server"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| context_error!("Invalid server address: {}", e))?;

    let state = AppState::connect(config)
        .await
        .map_err(|e| context_error!("Failed to connect backends: {}", e))?;
    let shutdown = state.shutdown.clone();
    let app = build_router(Arc::new(state));

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| context_error!("Failed to bind to {}: {}", addr, e))?;
    info!(%addr, "Server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(|e| context_error!("Server error: {}", e))?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel every open view scope
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received terminate signal, shutting down"),
    }
    shutdown.cancel();
}
