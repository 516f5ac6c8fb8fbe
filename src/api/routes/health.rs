//! Health Routes
//!
//! - GET /health - Hub status with subscriber count

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health
///
/// The hub itself has no dependencies that can go down; a missing tattoo
/// renderer reports the service as degraded.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let tattoo = state.tattoo.is_some();

    Json(HealthResponse {
        status: (if tattoo { "healthy" } else { "degraded" }).to_string(),
        subscribers: state.subscriber_count().await,
        tattoo,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
