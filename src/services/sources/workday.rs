//! Workday career sites (`*.myworkdayjobs.com`).
//!
//! Each configured site URL is fetched with the search text in `q` and the
//! returned page is parsed with the career page extractor. Sites that only
//! render client-side yield nothing here; `/api/v1/scrape` renders those in
//! the browser instead.

use async_trait::async_trait;
use futures::future::join_all;

use super::{matches_location, JobSource, SourceError};
use crate::models::job::JobPosting;
use crate::services::career_page::{company_from_url, extract_postings};

pub struct WorkdaySource {
    http: reqwest::Client,
    sites: Vec<String>,
}

impl WorkdaySource {
    pub fn new(http: reqwest::Client, sites: Vec<String>) -> Self {
        Self { http, sites }
    }

    async fn fetch_site(&self, site: &str, query: &str) -> Result<String, SourceError> {
        let response = self.http.get(site).query(&[("q", query)]).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                source_name: format!("workday site {}", site),
                status: response.status(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl JobSource for WorkdaySource {
    fn name(&self) -> &str {
        "workday"
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<JobPosting>, SourceError> {
        let pages = join_all(self.sites.iter().map(|site| self.fetch_site(site, query))).await;

        let mut postings = Vec::new();
        let mut last_error = None;
        let mut any_ok = false;

        for (site, page) in self.sites.iter().zip(pages) {
            match page {
                Ok(html) => {
                    any_ok = true;
                    let prefix = format!("workday_{}", company_from_url(site));
                    postings.extend(
                        extract_postings(&html, site, query, location, &prefix)
                            .into_iter()
                            .filter(|job| matches_location(&job.location, location)),
                    );
                }
                Err(e) => {
                    tracing::warn!(site = %site, error = %e, "Workday site fetch failed");
                    last_error = Some(e);
                }
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
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_parses_site_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/External"))
            .and(query_param("q", "engineer"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<ul><li><a data-automation-id="jobTitle" href="/External/job/Remote/Engineer_R1">Build Engineer</a>
                   <div data-automation-id="locations">Remote, USA</div></li></ul>"#,
            ))
            .mount(&server)
            .await;

        let site = format!("{}/External", server.uri());
        let source = WorkdaySource::new(reqwest::Client::new(), vec![site]);
        let jobs = source.fetch("engineer", "Denver, CO").await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Build Engineer");
        assert_eq!(jobs[0].location, "Remote, USA");
        assert!(jobs[0].id.starts_with("workday_"));
    }
}
