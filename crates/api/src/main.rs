//! Tablecat - demo catalog API service.
//!
//! Main entry point: configuration, logging, state wiring, and the axum
//! server with graceful shutdown.

use std::net::SocketAddr;

use anyhow::Context;
use tablecat_api::{build_state, routes};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment first: the config loader honors TABLECAT_CONFIG_PATH.
    let _ = dotenvy::dotenv();

    let config = tablecat_infra::config::load()?;
    tablecat_api::logging::init(&config.log);
    info!("starting program");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let state = build_state(config)?;
    let app = routes::router(state);

    let listener = TcpListener::bind(addr).await.context("failed to bind server address")?;
    info!(%addr, "server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("shutdown program");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
