//! Adzuna job search API.
//!
//! Docs: <https://developer.adzuna.com/docs/search>

use async_trait::async_trait;
use serde::Deserialize;

use super::{is_nationwide, JobSource, SourceError};
use crate::models::job::{posted_date_from, JobPosting};

const RESULTS_PER_PAGE: &str = "50";

pub struct AdzunaSource {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_key: String,
    country: String,
}

#[derive(Deserialize)]
struct AdzunaResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Deserialize)]
struct AdzunaJob {
    id: serde_json::Value,
    title: Option<String>,
    company: Option<AdzunaCompany>,
    location: Option<AdzunaLocation>,
    created: Option<String>,
    description: Option<String>,
    redirect_url: Option<String>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    contract_type: Option<String>,
    contract_time: Option<String>,
}

#[derive(Deserialize)]
struct AdzunaCompany {
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct AdzunaLocation {
    display_name: Option<String>,
    #[serde(default)]
    area: Vec<String>,
}

impl AdzunaSource {
    pub fn new(http: reqwest::Client, app_id: String, app_key: String, country: String) -> Self {
        Self {
            http,
            base_url: "https://api.adzuna.com".to_string(),
            app_id,
            app_key,
            country,
        }
    }

    /// Point the source at a different host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `None` for results without a title.
    fn to_posting(&self, job: AdzunaJob, location: &str) -> Option<JobPosting> {
        let title = job.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        let id = match &job.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let job_location = job
            .location
            .and_then(|l| {
                l.display_name
                    .or_else(|| (!l.area.is_empty()).then(|| l.area.join(", ")))
            })
            .or_else(|| (!location.is_empty()).then(|| location.to_string()))
            .unwrap_or_else(|| "Location not specified".to_string());

        Some(JobPosting {
            id: format!("adzuna_{}", id),
            title,
            company: job
                .company
                .and_then(|c| c.display_name)
                .unwrap_or_else(|| "Company not specified".to_string()),
            location: job_location,
            posted_date: posted_date_from(job.created.as_deref()),
            description: job.description,
            url: job.redirect_url,
            salary: format_salary(job.salary_min, job.salary_max),
            job_type: job.contract_type.or(job.contract_time),
        })
    }
}

#[async_trait]
impl JobSource for AdzunaSource {
    fn name(&self) -> &str {
        "adzuna"
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<JobPosting>, SourceError> {
        let url = format!(
            "{}/v1/api/jobs/{}/search/1",
            self.base_url.trim_end_matches('/'),
            self.country
        );

        let mut params = vec![
            ("app_id", self.app_id.as_str()),
            ("app_key", self.app_key.as_str()),
            ("results_per_page", RESULTS_PER_PAGE),
            ("what", query),
            ("sort_by", "date"),
        ];
        if !is_nationwide(location) {
            params.push(("where", location));
        }

        tracing::debug!(query = %query, location = %location, "Fetching from Adzuna");

        let response = self.http.get(&url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                source_name: self.name().to_string(),
                status: response.status(),
            });
        }

        let body: AdzunaResponse = response.json().await?;
        Ok(body
            .results
            .into_iter()
            .filter_map(|job| self.to_posting(job, location))
            .collect())
    }
}

/// Render an Adzuna salary range as `$min - $max`, `$min+` or `Up to $max`.
pub fn format_salary(min: Option<f64>, max: Option<f64>) -> Option<String> {
    let min = min.filter(|v| *v > 0.0);
    let max = max.filter(|v| *v > 0.0);
    match (min, max) {
        (Some(lo), Some(hi)) => Some(format!("${} - ${}", thousands(lo), thousands(hi))),
        (Some(lo), None) => Some(format!("${}+", thousands(lo))),
        (None, Some(hi)) => Some(format!("Up to ${}", thousands(hi))),
        (None, None) => None,
    }
}

/// Whole-number rendering with comma thousands separators.
pub fn thousands(value: f64) -> String {
    let digits = format!("{}", value.round() as i64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
