//! Knuxhub HTTP Surface
//!
//! HTTP layer for the hub, built with Axum.
//!
//! # Endpoints
//!
//! - `GET /echo1` - WebSocket subscription (path configurable)
//! - `GET /knux?t=TEXT` - Knuckle tattoo PNG (path configurable)
//! - `GET /health` - Hub status
//! - everything else - static files
//!
//! # Example
//!
//! ```rust,ignore
//! use knuxhub::api::{serve, AppState};
//! use knuxhub::config::ServerConfig;
//! use knuxhub::websocket::{BroadcastHub, HubConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Arc::new(BroadcastHub::new(HubConfig::default()));
//!     let config = ServerConfig::default();
//!
//!     let state = AppState::new(hub, config.clone());
//!     serve(state, &config, CancellationToken::new()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::websocket::websocket_handler;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    let ws_path = state.config.ws_path.clone();
    let tattoo_path = state.config.tattoo_path.clone();

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route(&ws_path, get(websocket_handler))
        .route(&tattoo_path, get(routes::tattoo::render_tattoo))
        .route("/health", get(routes::health::health))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the HTTP server
///
/// Stops accepting once `shutdown` is cancelled, then drops every hub
/// subscriber so open WebSocket connections close.
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<(), ApiError> {
    let hub = Arc::clone(&state.hub);
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Knuxhub listening on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.cancelled().await;
        hub.shutdown().await;
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Knuxhub HTTP server shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel `shutdown`
pub async fn shutdown_signal(shutdown: CancellationToken) {
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
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    shutdown.cancel();
}
