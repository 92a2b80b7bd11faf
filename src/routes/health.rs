use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub sources: Vec<String>,
    pub active_streams: usize,
}

/// GET /health: liveness plus the configured job sources.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        sources: state
            .aggregator
            .source_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        active_streams: state.streams.active_sessions(),
    })
}
