//! Lever postings API (`api.lever.co/v0/postings/{company}?mode=json`).

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;

use super::{matches_location, matches_query, non_empty, JobSource, SourceError};
use crate::models::job::{posted_date_from_millis, JobPosting};

pub struct LeverSource {
    http: reqwest::Client,
    base_url: String,
    companies: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverPosting {
    id: String,
    text: String,
    created_at: Option<i64>,
    hosted_url: Option<String>,
    description_plain: Option<String>,
    categories: Option<LeverCategories>,
    salary_range: Option<LeverSalary>,
}

#[derive(Deserialize)]
struct LeverCategories {
    location: Option<String>,
    commitment: Option<String>,
}

#[derive(Deserialize)]
struct LeverSalary {
    min: Option<f64>,
    max: Option<f64>,
    currency: Option<String>,
    interval: Option<String>,
}

impl LeverSource {
    pub fn new(http: reqwest::Client, companies: Vec<String>) -> Self {
        Self {
            http,
            base_url: "https://api.lever.co".to_string(),
            companies,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_company(&self, company: &str) -> Result<Vec<LeverPosting>, SourceError> {
        let url = format!(
            "{}/v0/postings/{}",
            self.base_url.trim_end_matches('/'),
            company
        );
        let response = self
            .http
            .get(&url)
            .query(&[("mode", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                source_name: format!("lever company {}", company),
                status: response.status(),
            });
        }

        Ok(response.json().await?)
    }
}

fn format_lever_salary(salary: &LeverSalary) -> Option<String> {
    let currency = salary.currency.as_deref().unwrap_or("USD");
    let range = match (salary.min, salary.max) {
        (Some(lo), Some(hi)) => format!("{} {:.0} - {:.0}", currency, lo, hi),
        (Some(lo), None) => format!("{} {:.0}+", currency, lo),
        (None, Some(hi)) => format!("Up to {} {:.0}", currency, hi),
        (None, None) => return None,
    };
    Some(match salary.interval.as_deref() {
        Some(interval) => format!("{} ({})", range, interval),
        None => range,
    })
}

#[async_trait]
impl JobSource for LeverSource {
    fn name(&self) -> &str {
        "lever"
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<JobPosting>, SourceError> {
        let results = join_all(self.companies.iter().map(|c| self.fetch_company(c))).await;

        let mut postings = Vec::new();
        let mut last_error = None;
        let mut any_ok = false;

        for (company, result) in self.companies.iter().zip(results) {
            let jobs = match result {
                Ok(jobs) => {
                    any_ok = true;
                    jobs
                }
                Err(e) => {
                    tracing::warn!(company = %company, error = %e, "Lever company fetch failed");
                    last_error = Some(e);
                    continue;
                }
            };

            for job in jobs {
                let (job_location, commitment) = match job.categories {
                    Some(c) => (c.location, c.commitment),
                    None => (None, None),
                };
                let job_location =
                    job_location.unwrap_or_else(|| "Location not specified".to_string());
                if !matches_query(&job.text, query) || !matches_location(&job_location, location) {
                    continue;
                }

                postings.push(JobPosting {
                    id: format!("lever_{}_{}", company, job.id),
                    title: job.text,
                    company: company.clone(),
                    location: job_location,
                    posted_date: posted_date_from_millis(job.created_at),
                    description: job.description_plain.and_then(non_empty),
                    url: job.hosted_url,
                    salary: job.salary_range.as_ref().and_then(format_lever_salary),
                    job_type: commitment,
                });
            }
        }

        match (any_ok, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(postings),
        }
    }
}
