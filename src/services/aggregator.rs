use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::models::job::JobPosting;
use crate::services::sources::JobSource;

/// Query used when the caller gives neither keywords nor career interests.
pub const DEFAULT_QUERY: &str = "software engineer";

/// A job search as received from the API.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub keywords: Option<String>,
    pub location: Option<String>,
    pub career_interests: Vec<String>,
}

impl SearchParams {
    /// Queries to run, in order: one per career interest, otherwise the
    /// keywords, otherwise [`DEFAULT_QUERY`].
    pub fn queries(&self) -> Vec<String> {
        let interests: Vec<String> = self
            .career_interests
            .iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        if !interests.is_empty() {
            return interests;
        }
        match self.keywords.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => vec![k.to_string()],
            _ => vec![DEFAULT_QUERY.to_string()],
        }
    }
}

/// Fans a search out to every configured [`JobSource`].
///
/// Sources are independent: a source that fails or exceeds its timeout
/// contributes nothing and the search carries on with the rest.
pub struct JobAggregator {
    sources: Vec<Arc<dyn JobSource>>,
    source_timeout: Duration,
    early_return_threshold: usize,
}

impl JobAggregator {
    pub fn new(
        sources: Vec<Arc<dyn JobSource>>,
        source_timeout: Duration,
        early_return_threshold: usize,
    ) -> Self {
        Self {
            sources,
            source_timeout,
            early_return_threshold,
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Run a search. Never fails; an empty list means nothing was found or
    /// every source was unavailable.
    pub async fn search(&self, params: &SearchParams) -> Vec<JobPosting> {
        let start = Instant::now();
        let location = params.location.as_deref().map(str::trim).unwrap_or_default();
        let queries = params.queries();

        let mut collected = Vec::new();
        for query in &queries {
            collected.extend(self.fan_out(query, location).await);
            if collected.len() >= self.early_return_threshold {
                tracing::info!(
                    count = collected.len(),
                    threshold = self.early_return_threshold,
                    "Early return threshold reached, skipping remaining queries"
                );
                break;
            }
        }

        let unique = dedup(collected);
        let jobs = filter_by_interests(unique, &params.career_interests);

        tracing::info!(
            queries = queries.len(),
            results = jobs.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Job search completed"
        );
        jobs
    }

    /// Query every source concurrently; results are appended in source order.
    async fn fan_out(&self, query: &str, location: &str) -> Vec<JobPosting> {
        let calls = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            async move {
                // Dropping the timed-out future cancels its in-flight request.
                let outcome = tokio::time::timeout(self.source_timeout, source.fetch(query, location)).await;
                (source, outcome)
            }
        });

        let mut postings = Vec::new();
        for (source, outcome) in join_all(calls).await {
            match outcome {
                Ok(Ok(jobs)) => {
                    tracing::debug!(source = source.name(), query, count = jobs.len(), "Source returned postings");
                    postings.extend(jobs);
                }
                Ok(Err(e)) => {
                    metrics::counter!("job_source_failures_total", "source" => source.name().to_string())
                        .increment(1);
                    tracing::warn!(source = source.name(), query, error = %e, "Job source failed");
                }
                Err(_) => {
                    metrics::counter!("job_source_failures_total", "source" => source.name().to_string())
                        .increment(1);
                    tracing::warn!(
                        source = source.name(),
                        query,
                        timeout_secs = self.source_timeout.as_secs_f64(),
                        "Job source timed out"
                    );
                }
            }
        }
        postings
    }
}

/// Drop postings whose normalized title, company and location were already
/// seen. The first occurrence wins and order is preserved.
pub fn dedup(postings: Vec<JobPosting>) -> Vec<JobPosting> {
    let mut seen = HashSet::new();
    postings
        .into_iter()
        .filter(|p| seen.insert(p.dedup_key()))
        .collect()
}

/// Keep postings that mention any of the interests. When nothing matches,
/// the unfiltered list is returned.
pub fn filter_by_interests(postings: Vec<JobPosting>, interests: &[String]) -> Vec<JobPosting> {
    let interests: Vec<&str> = interests
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect();
    if interests.is_empty() {
        return postings;
    }

    let matching: Vec<JobPosting> = postings
        .iter()
        .filter(|p| interests.iter().any(|i| p.matches_interest(i)))
        .cloned()
        .collect();

    if matching.is_empty() {
        tracing::info!("No postings matched career interests, returning unfiltered results");
        postings
    } else {
        matching
    }
}
