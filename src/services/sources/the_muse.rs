//! The Muse public jobs API.
//!
//! The API filters by category rather than keyword, so the query is mapped to
//! the closest category and results are keyword-filtered locally.

use async_trait::async_trait;
use serde::Deserialize;

use super::{is_nationwide, matches_query, strip_html, JobSource, SourceError};
use crate::models::job::{posted_date_from, JobPosting};

pub struct TheMuseSource {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct MuseResponse {
    #[serde(default)]
    results: Vec<MuseJob>,
}

#[derive(Deserialize)]
struct MuseJob {
    id: serde_json::Value,
    name: Option<String>,
    contents: Option<String>,
    publication_date: Option<String>,
    #[serde(rename = "type")]
    job_type: Option<String>,
    company: Option<MuseNamed>,
    #[serde(default)]
    locations: Vec<MuseNamed>,
    refs: Option<MuseRefs>,
}

#[derive(Deserialize)]
struct MuseNamed {
    name: Option<String>,
}

#[derive(Deserialize)]
struct MuseRefs {
    landing_page: Option<String>,
}

impl TheMuseSource {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: "https://www.themuse.com".to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Map free-text keywords onto one of The Muse's job categories.
pub fn category_for(keywords: &str) -> Option<&'static str> {
    let kw = keywords.to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|t| kw.contains(t));

    if has(&["software", "engineer", "developer"]) {
        Some("Software Engineering")
    } else if has(&["data", "analyst"]) {
        Some("Data Science")
    } else if has(&["product", "manager"]) {
        Some("Product")
    } else if has(&["marketing"]) {
        Some("Marketing")
    } else if has(&["finance", "accounting"]) {
        Some("Finance")
    } else if has(&["design"]) {
        Some("Design")
    } else {
        None
    }
}

#[async_trait]
impl JobSource for TheMuseSource {
    fn name(&self) -> &str {
        "themuse"
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<JobPosting>, SourceError> {
        let url = format!("{}/api/public/jobs", self.base_url.trim_end_matches('/'));

        let mut params: Vec<(&str, &str)> = vec![("page", "1")];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("api_key", key));
        }
        if let Some(category) = category_for(query) {
            params.push(("category", category));
        }
        if !is_nationwide(location) {
            params.push(("location", location));
        }

        let response = self.http.get(&url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                source_name: self.name().to_string(),
                status: response.status(),
            });
        }

        let body: MuseResponse = response.json().await?;
        let jobs = body
            .results
            .into_iter()
            .filter_map(|job| {
                let title = job.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
                let company = job
                    .company
                    .and_then(|c| c.name)
                    .unwrap_or_else(|| "Company not specified".to_string());
                let description = job.contents.as_deref().map(strip_html);

                let haystack = format!("{} {} {}", title, company, description.as_deref().unwrap_or_default());
                if !matches_query(&haystack, query) {
                    return None;
                }

                let id = match &job.id {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };

                Some(JobPosting {
                    id: format!("themuse_{}", id),
                    title,
                    company,
                    location: job
                        .locations
                        .into_iter()
                        .find_map(|l| l.name)
                        .or_else(|| (!location.is_empty()).then(|| location.to_string()))
                        .unwrap_or_else(|| "Location not specified".to_string()),
                    posted_date: posted_date_from(job.publication_date.as_deref()),
                    description,
                    url: job.refs.and_then(|r| r.landing_page),
                    salary: None,
                    job_type: job.job_type,
                })
            })
            .collect();

        Ok(jobs)
    }
}
