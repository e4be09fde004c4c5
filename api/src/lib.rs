//! Routepulse API Server
//!
//! This crate provides the HTTP server for Routepulse. It captures timing data
//! for requests on instrumented path prefixes, keeps an append-only event log,
//! and serves aggregated analytics both on demand and as a live push stream.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - A capture middleware that records every instrumented request
//! - `GET /api/analytics` for the current analytics snapshot
//! - `GET /api/analytics/stream` pushing a fresh snapshot after each capture
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod capture;
mod config;
mod db;
mod routes;
mod state;

pub use capture::{capture_middleware, CaptureScope};
pub use config::{Config, ConfigError, StoreBackend};
pub use db::{Database, DatabaseConfig};
pub use routes::{AnalyticsErrorResponse, ANALYTICS_ERROR_MESSAGE};
pub use state::{AppState, NotificationTarget};

use anyhow::{Context, Result};
use axum::{middleware, Router};
use shared::notify::BroadcastNotifier;
use shared::storage::{ClickHouseEventStore, EventStore, InMemoryEventStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Runs the Routepulse API server.
///
/// This function initializes the server with configuration from the command
/// line and environment variables and starts listening for incoming
/// connections. It handles graceful shutdown on SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded or is invalid
/// - The event store cannot be reached
/// - The server fails to bind to the configured address
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Routepulse API server with the provided configuration.
///
/// This is useful for testing or when you want to provide configuration programmatically.
///
/// # Errors
///
/// Returns an error if:
/// - The event store cannot be reached or its schema cannot be created
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    config.validate()?;
    let addr = config.socket_addr();

    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store,
        capture_prefixes = ?config.capture_prefixes,
        "Routepulse API server starting"
    );

    let state = build_state(&config).await?;
    let app = create_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Builds the application state for `config`.
///
/// A `ClickHouse` store is pinged and its table created before the server
/// accepts traffic; any failure here is fatal.
///
/// # Errors
///
/// Returns an error if the configured store cannot be initialized.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let event_store: Arc<dyn EventStore> = match config.store {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory event store");
            InMemoryEventStore::new_shared()
        }
        StoreBackend::Clickhouse => {
            let db = Database::new(&config.database());
            db.ping().await?;
            tracing::info!(url = %config.db_url, database = %config.db_name, "Connected to ClickHouse");

            let store = ClickHouseEventStore::new_shared(db.client());
            store
                .ensure_schema()
                .context("Failed to create request_analytics table")?;
            store
        }
    };

    Ok(AppState::new(
        event_store,
        BroadcastNotifier::new(config.notify_capacity),
        NotificationTarget::new(&config.notify_channel, &config.notify_event),
        CaptureScope::new(config.capture_prefixes.iter().cloned()),
    ))
}

/// Creates the main application router with all routes and middleware.
///
/// The capture middleware wraps the panic handler, so a request whose handler
/// panics is still answered (with 500) and still recorded.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::analytics_routes(state.clone()))
        .merge(routes::wait_routes())
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(state, capture_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
