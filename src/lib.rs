//! Job Autopilot
//!
//! Aggregates job postings from public job APIs, ATS boards and job board
//! search pages, and drives a headless browser through ATS application forms
//! on behalf of an applicant.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use app_state::AppState;

/// Request body cap; inline base64 resumes make bodies large.
const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Build the HTTP API. `/metrics` is only mounted when a Prometheus handle
/// is supplied.
pub fn build_router(state: AppState, prometheus_handle: Option<Arc<PrometheusHandle>>) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/jobs", get(routes::jobs::search_jobs))
        .route("/api/v1/automate", post(routes::automate::automate_application))
        .route("/api/v1/job-details", post(routes::details::job_details))
        .route("/api/v1/scrape", post(routes::scrape::scrape_career_page))
        .route("/api/v1/stream/{session_id}", get(routes::stream::stream_session))
        .with_state(state);

    if let Some(handle) = prometheus_handle {
        app = app.route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
}

/// Browser clients call the API cross-origin with Supabase-style headers.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}
