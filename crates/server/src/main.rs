//! chatline
//!
//! A minimal real-time chat relay. Clients connect over WebSocket, name
//! themselves, and exchange messages that are fanned out to every other
//! connected peer. A small read-only HTTP API exposes the session list and
//! per-session message history.

mod broadcast;
mod config;
mod connection;
mod directory;
mod error;
mod logging;
mod message_log;
mod registry;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::config::{Cli, ServerConfig};
use crate::logging::init_logging;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging = init_logging()?;

    let config = ServerConfig::from_cli(&cli)?;
    info!(
        component = "server",
        event = "server.starting",
        version = env!("CARGO_PKG_VERSION"),
        "Starting chatline..."
    );

    let state = Arc::new(AppState::new());
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        component = "server",
        event = "server.listening",
        addr = %config.bind_addr,
        "Listening on http://{}",
        config.bind_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let dropped = state.disconnect_all().await;
    info!(
        component = "server",
        event = "server.stopped",
        dropped_connections = dropped,
        "Shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(
            component = "server",
            event = "server.signal_failed",
            error = %e,
            "Failed to listen for ctrl-c"
        );
        std::future::pending::<()>().await;
    }
    info!(
        component = "server",
        event = "server.shutdown_requested",
        "Shutting down..."
    );
}
