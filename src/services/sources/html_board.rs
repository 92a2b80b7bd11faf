//! Search-page scrapers for the big job boards (Indeed, Monster, Glassdoor).
//!
//! The boards share one scraper; what differs is the search URL and the CSS
//! selectors for a result card, described by a [`BoardLayout`].

use async_trait::async_trait;
use scraper::{Html, Selector};
use uuid::Uuid;

use super::{absolute_url, element_text, non_empty, JobSource, SourceError};
use crate::models::job::{today, JobPosting};

/// Where a board's search page lives and how its result cards are shaped.
pub struct BoardLayout {
    pub name: &'static str,
    pub base_url: &'static str,
    pub search_path: &'static str,
    pub query_param: &'static str,
    pub location_param: &'static str,
    /// Extra fixed query parameters.
    pub fixed_params: &'static [(&'static str, &'static str)],
    pub card: &'static str,
    pub title: &'static str,
    pub link: &'static str,
    pub company: &'static str,
    pub location: &'static str,
    pub salary: Option<&'static str>,
    pub description: &'static str,
}

pub const INDEED: BoardLayout = BoardLayout {
    name: "indeed",
    base_url: "https://www.indeed.com",
    search_path: "/jobs",
    query_param: "q",
    location_param: "l",
    fixed_params: &[],
    card: ".job_seen_beacon, .slider_container",
    title: "h2.jobTitle a, .jobTitle a, a[data-jk], h2.jobTitle",
    link: "h2.jobTitle a, .jobTitle a, a[data-jk]",
    company: ".companyName, [data-testid=\"company-name\"]",
    location: ".companyLocation, [data-testid=\"text-location\"]",
    salary: Some(".salary-snippet-container, .attribute_snippet"),
    description: ".job-snippet, .summary",
};

pub const MONSTER: BoardLayout = BoardLayout {
    name: "monster",
    base_url: "https://www.monster.com",
    search_path: "/jobs/search/",
    query_param: "q",
    location_param: "where",
    fixed_params: &[],
    card: "[data-testid=\"organic-job\"], .card-content",
    title: "h2 a, h3 a, .title a",
    link: "h2 a, h3 a, .title a",
    company: ".company, [data-testid=\"company-name\"]",
    location: ".location, [data-testid=\"job-location\"]",
    salary: None,
    description: ".summary, .description",
};

pub const GLASSDOOR: BoardLayout = BoardLayout {
    name: "glassdoor",
    base_url: "https://www.glassdoor.com",
    search_path: "/Job/jobs.htm",
    query_param: "sc.keyword",
    location_param: "locId",
    fixed_params: &[("locT", "C")],
    card: "[data-test=\"job-listing\"], .jobContainer, .react-job-listing",
    title: "[data-test=\"job-title\"], .jobTitle a",
    link: "[data-test=\"job-title\"] a, a[data-test=\"job-title\"], .jobTitle a",
    company: "[data-test=\"employer-name\"], .employerName",
    location: "[data-test=\"job-location\"], .location",
    salary: Some("[data-test=\"detailSalary\"], .salary-estimate"),
    description: ".jobDescriptionContent, .jobDescription",
};

pub struct HtmlBoardSource {
    http: reqwest::Client,
    layout: &'static BoardLayout,
    base_url: String,
}

impl HtmlBoardSource {
    pub fn new(http: reqwest::Client, layout: &'static BoardLayout) -> Self {
        Self {
            http,
            layout,
            base_url: layout.base_url.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Parse the result cards of a search page.
    ///
    /// Cards without both a title and a company are skipped.
    pub fn parse_listings(&self, html: &str, location: &str) -> Vec<JobPosting> {
        let layout = self.layout;
        let document = Html::parse_document(html);
        let (Ok(card_sel), Ok(title_sel), Ok(link_sel), Ok(company_sel), Ok(location_sel), Ok(desc_sel)) = (
            Selector::parse(layout.card),
            Selector::parse(layout.title),
            Selector::parse(layout.link),
            Selector::parse(layout.company),
            Selector::parse(layout.location),
            Selector::parse(layout.description),
        ) else {
            tracing::error!(board = layout.name, "Invalid board selectors");
            return Vec::new();
        };
        let salary_sel = layout.salary.and_then(|s| Selector::parse(s).ok());

        let mut postings = Vec::new();
        for card in document.select(&card_sel) {
            let title = card.select(&title_sel).next().map(element_text).unwrap_or_default();
            let company = card.select(&company_sel).next().map(element_text).unwrap_or_default();
            if title.is_empty() || company.is_empty() {
                continue;
            }

            let job_location = card
                .select(&location_sel)
                .next()
                .map(element_text)
                .and_then(non_empty)
                .or_else(|| non_empty(location.to_string()))
                .unwrap_or_else(|| "Location not specified".to_string());

            let url = card
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| absolute_url(&self.base_url, href));

            let salary = salary_sel
                .as_ref()
                .and_then(|sel| card.select(sel).next())
                .map(element_text)
                .and_then(non_empty);

            let description = card.select(&desc_sel).next().map(element_text).and_then(non_empty);

            postings.push(JobPosting {
                id: format!("{}_{}", layout.name, Uuid::new_v4().simple()),
                title,
                company,
                location: job_location,
                posted_date: today(),
                description,
                url,
                salary,
                job_type: None,
            });
        }
        postings
    }
}

#[async_trait]
impl JobSource for HtmlBoardSource {
    fn name(&self) -> &str {
        self.layout.name
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<JobPosting>, SourceError> {
        let layout = self.layout;
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), layout.search_path);

        let mut params: Vec<(&str, &str)> = vec![
            (layout.query_param, query),
            (layout.location_param, location),
        ];
        params.extend(layout.fixed_params.iter().copied());

        let response = self
            .http
            .get(&url)
            .query(&params)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                source_name: layout.name.to_string(),
                status: response.status(),
            });
        }

        let html = response.text().await?;
        let postings = self.parse_listings(&html, location);
        tracing::debug!(board = layout.name, count = postings.len(), "Parsed board listings");
        Ok(postings)
    }
}
