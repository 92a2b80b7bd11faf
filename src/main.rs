use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use job_autopilot::app_state::AppState;
use job_autopilot::config::AppConfig;
use job_autopilot::routes::metrics::describe_metrics;
use job_autopilot::services::browser::chromium::{ChromiumDriver, LaunchSettings};
use job_autopilot::services::browser::BrowserDriver;
use job_autopilot::services::sources::build_http_client;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing job-autopilot server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    describe_metrics();

    // Outbound HTTP client shared by job sources, resume downloads and job details
    let http = build_http_client(&config).expect("Failed to build HTTP client");

    // Headless browser driver; sessions are launched per request
    tracing::info!(
        proxy = config.proxy_server().is_some(),
        chrome = ?config.chrome_executable,
        "Configuring Chromium driver"
    );
    let browser: Arc<dyn BrowserDriver> = Arc::new(ChromiumDriver::new(LaunchSettings::from_config(&config)));

    let state = AppState::from_config(&config, http, browser);
    let app = job_autopilot::build_router(state, Some(prometheus_handle));

    tracing::info!("Starting job-autopilot on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
