//! Health and cache maintenance handlers

use axum::{extract::State, response::IntoResponse};
use tracing::info;

use crate::web::{
    AppState,
    responses::{FlushResponse, HealthResponse, ok},
};

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.engine.cache().stats().await;

    ok(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        font: state.engine.font().name().to_string(),
        cache,
    })
}

/// `POST /cache/flush`
pub async fn flush_cache(State(state): State<AppState>) -> impl IntoResponse {
    let removed = state.engine.cache().flush().await;
    info!("Avatar cache flushed on request ({} entries removed)", removed);
    ok(FlushResponse { removed })
}
