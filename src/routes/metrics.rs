use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// GET /metrics: search, source failure and automation run metrics in
/// Prometheus text format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for every metric the service records.
pub fn describe_metrics() {
    metrics::describe_counter!("job_search_requests_total", "Job search requests received");
    metrics::describe_counter!(
        "job_source_failures_total",
        "Job source calls that failed or timed out, by source"
    );
    metrics::describe_counter!("automation_runs_total", "Automation runs by outcome");
    metrics::describe_histogram!(
        "automation_duration_seconds",
        "Wall time of one automation run"
    );
}
