//! Greenhouse job board API.
//!
//! Each configured board token is fetched concurrently from
//! `boards-api.greenhouse.io/v1/boards/{token}/jobs?content=true`.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;

use super::{matches_location, matches_query, non_empty, strip_html, JobSource, SourceError};
use crate::models::job::{posted_date_from, JobPosting};

pub struct GreenhouseSource {
    http: reqwest::Client,
    base_url: String,
    boards: Vec<String>,
}

#[derive(Deserialize)]
struct BoardResponse {
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

#[derive(Deserialize)]
struct GreenhouseJob {
    id: u64,
    title: String,
    updated_at: Option<String>,
    location: Option<GreenhouseLocation>,
    absolute_url: Option<String>,
    content: Option<String>,
    company_name: Option<String>,
}

#[derive(Deserialize)]
struct GreenhouseLocation {
    name: Option<String>,
}

impl GreenhouseSource {
    pub fn new(http: reqwest::Client, boards: Vec<String>) -> Self {
        Self {
            http,
            base_url: "https://boards-api.greenhouse.io".to_string(),
            boards,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_board(&self, board: &str) -> Result<Vec<GreenhouseJob>, SourceError> {
        let url = format!(
            "{}/v1/boards/{}/jobs",
            self.base_url.trim_end_matches('/'),
            board
        );
        let response = self
            .http
            .get(&url)
            .query(&[("content", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                source_name: format!("greenhouse board {}", board),
                status: response.status(),
            });
        }

        let body: BoardResponse = response.json().await?;
        Ok(body.jobs)
    }
}

/// Display name for a board token when the API doesn't report one.
fn company_from_token(token: &str) -> String {
    token
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl JobSource for GreenhouseSource {
    fn name(&self) -> &str {
        "greenhouse"
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<JobPosting>, SourceError> {
        let results = join_all(self.boards.iter().map(|board| self.fetch_board(board))).await;

        let mut postings = Vec::new();
        let mut last_error = None;
        let mut any_ok = false;

        for (board, result) in self.boards.iter().zip(results) {
            let jobs = match result {
                Ok(jobs) => {
                    any_ok = true;
                    jobs
                }
                Err(e) => {
                    tracing::warn!(board = %board, error = %e, "Greenhouse board fetch failed");
                    last_error = Some(e);
                    continue;
                }
            };

            for job in jobs {
                let job_location = job
                    .location
                    .and_then(|l| l.name)
                    .unwrap_or_else(|| "Location not specified".to_string());
                if !matches_query(&job.title, query) || !matches_location(&job_location, location) {
                    continue;
                }
                // Board content arrives HTML-escaped; the first pass decodes
                // entities, the second drops the tags.
                let description = job
                    .content
                    .as_deref()
                    .map(|c| strip_html(&strip_html(c)))
                    .and_then(non_empty);

                postings.push(JobPosting {
                    id: format!("greenhouse_{}_{}", board, job.id),
                    title: job.title,
                    company: job
                        .company_name
                        .unwrap_or_else(|| company_from_token(board)),
                    location: job_location,
                    posted_date: posted_date_from(job.updated_at.as_deref()),
                    description,
                    url: job.absolute_url,
                    salary: None,
                    job_type: None,
                });
            }
        }

        match (any_ok, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(postings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_company_from_token() {
        assert_eq!(company_from_token("acme"), "Acme");
        assert_eq!(company_from_token("big-river_labs"), "Big River Labs");
    }

    #[tokio::test]
    async fn test_fetch_merges_boards_and_skips_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/boards/acme/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobs": [
                    {
                        "id": 1,
                        "title": "Software Engineer, Platform",
                        "updated_at": "2025-04-02T12:00:00-04:00",
                        "location": {"name": "Remote"},
                        "absolute_url": "https://boards.greenhouse.io/acme/jobs/1",
                        "content": "&lt;p&gt;Build the platform&lt;/p&gt;"
                    },
                    {
                        "id": 2,
                        "title": "Account Executive",
                        "location": {"name": "Remote"}
                    }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/boards/gone/jobs"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = GreenhouseSource::new(
            reqwest::Client::new(),
            vec!["acme".to_string(), "gone".to_string()],
        )
        .with_base_url(server.uri());
        let jobs = source.fetch("software engineer", "").await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "greenhouse_acme_1");
        assert_eq!(jobs[0].company, "Acme");
        assert_eq!(jobs[0].posted_date, "2025-04-02");
        assert_eq!(jobs[0].description.as_deref(), Some("Build the platform"));
    }

    #[tokio::test]
    async fn test_fetch_all_boards_failing_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = GreenhouseSource::new(reqwest::Client::new(), vec!["acme".to_string()])
            .with_base_url(server.uri());
        assert!(source.fetch("engineer", "").await.is_err());
    }
}
