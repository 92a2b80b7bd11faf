use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::services::{
    aggregator::JobAggregator,
    automation::AutomationEngine,
    browser::BrowserDriver,
    job_details::DetailsExtractor,
    sources,
    stream::StreamHub,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<JobAggregator>,
    pub automation: Arc<AutomationEngine>,
    pub details: Arc<DetailsExtractor>,
    pub streams: Arc<StreamHub>,
    pub browser: Arc<dyn BrowserDriver>,
    pub navigation_timeout: Duration,
}

impl AppState {
    pub fn new(
        aggregator: JobAggregator,
        automation: AutomationEngine,
        details: DetailsExtractor,
        streams: Arc<StreamHub>,
        browser: Arc<dyn BrowserDriver>,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            automation: Arc::new(automation),
            details: Arc::new(details),
            streams,
            browser,
            navigation_timeout,
        }
    }

    /// Wire every service from configuration around one HTTP client and one
    /// browser driver.
    pub fn from_config(config: &AppConfig, http: reqwest::Client, browser: Arc<dyn BrowserDriver>) -> Self {
        let navigation_timeout = Duration::from_secs(config.navigation_timeout_secs);
        let streams = Arc::new(StreamHub::new());

        let aggregator = JobAggregator::new(
            sources::from_config(config, http.clone()),
            Duration::from_secs(config.source_timeout_secs),
            config.early_return_threshold,
        );
        let automation = AutomationEngine::new(
            Arc::clone(&browser),
            http.clone(),
            Arc::clone(&streams),
            navigation_timeout,
        );
        let details = DetailsExtractor::new(http, Duration::from_secs(config.details_timeout_secs));

        tracing::info!(sources = ?aggregator.source_names(), "Job sources configured");

        Self::new(aggregator, automation, details, streams, browser, navigation_timeout)
    }
}
