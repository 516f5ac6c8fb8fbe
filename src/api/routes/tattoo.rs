//! Tattoo Routes
//!
//! - GET /knux?t=TEXT - Knuckle tattoo PNG

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::dto::TattooQuery;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /knux
///
/// Renders `t` (or the configured default text) onto the knuckles template.
pub async fn render_tattoo(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TattooQuery>,
) -> ApiResult<Response> {
    let renderer = state
        .tattoo
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable("Tattoo renderer not loaded".to_string()))?;

    let text = query
        .t
        .unwrap_or_else(|| state.tattoo_default_text.clone());
    tracing::debug!(text = %text, "Rendering tattoo");

    let png = tokio::task::spawn_blocking(move || renderer.render(&text))
        .await
        .map_err(|e| ApiError::Internal(format!("Render task failed: {}", e)))??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
