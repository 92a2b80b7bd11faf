//! Job sources queried by the search aggregator.
//!
//! Each source turns a free-text query plus optional location into
//! normalized [`JobPosting`]s. Sources either call a documented JSON API
//! (Adzuna, Greenhouse, Lever, The Muse) or fetch a search/career page and
//! parse its structure (Indeed, Monster, Glassdoor, Workday).

pub mod adzuna;
pub mod greenhouse;
pub mod html_board;
pub mod lever;
pub mod the_muse;
pub mod workday;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::ElementRef;

use crate::config::AppConfig;
use crate::models::job::JobPosting;

/// A single upstream the aggregator can fan out to.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Short lower-case name, also used as the posting id prefix.
    fn name(&self) -> &str;

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<JobPosting>, SourceError>;
}

/// Error type for job source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} returned HTTP {status}")]
    Status {
        source_name: String,
        status: reqwest::StatusCode,
    },

    #[error("Unexpected payload from {source_name}: {message}")]
    Payload { source_name: String, message: String },
}

/// Shared outbound client with a browser-like User-Agent.
pub fn build_http_client(config: &AppConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(30))
        .build()
}

/// Build the source list from configuration. Sources whose credentials or
/// targets are missing are left out.
pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Vec<Arc<dyn JobSource>> {
    let mut sources: Vec<Arc<dyn JobSource>> = Vec::new();

    if let (Some(id), Some(key)) = (&config.adzuna_app_id, &config.adzuna_app_key) {
        sources.push(Arc::new(adzuna::AdzunaSource::new(
            http.clone(),
            id.clone(),
            key.clone(),
            config.adzuna_country.clone(),
        )));
    }

    sources.push(Arc::new(the_muse::TheMuseSource::new(
        http.clone(),
        config.the_muse_api_key.clone(),
    )));

    let boards = clean_list(&config.greenhouse_boards);
    if !boards.is_empty() {
        sources.push(Arc::new(greenhouse::GreenhouseSource::new(http.clone(), boards)));
    }

    let companies = clean_list(&config.lever_companies);
    if !companies.is_empty() {
        sources.push(Arc::new(lever::LeverSource::new(http.clone(), companies)));
    }

    let sites = clean_list(&config.workday_sites);
    if !sites.is_empty() {
        sources.push(Arc::new(workday::WorkdaySource::new(http.clone(), sites)));
    }

    if config.job_boards_enabled {
        for layout in [&html_board::INDEED, &html_board::MONSTER, &html_board::GLASSDOOR] {
            sources.push(Arc::new(html_board::HtmlBoardSource::new(http.clone(), layout)));
        }
    }

    sources
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Whether `text` matches a free-text query.
///
/// The query may list alternatives joined by `OR`; an alternative matches when
/// the text contains it whole or contains any of its words longer than two
/// characters. An empty query matches everything.
pub fn matches_query(text: &str, query: &str) -> bool {
    let text = text.to_lowercase();
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    query.split(" or ").map(str::trim).any(|part| {
        let words: Vec<&str> = part.split_whitespace().filter(|w| w.len() > 2).collect();
        words.is_empty() || text.contains(part) || words.iter().any(|w| text.contains(w))
    })
}

/// Loose location filter for sources that return a company's whole board:
/// nationwide searches match everything, otherwise the posting location must
/// mention the wanted place or be remote.
pub fn matches_location(job_location: &str, wanted: &str) -> bool {
    if is_nationwide(wanted) {
        return true;
    }
    let job_location = job_location.to_lowercase();
    let wanted = wanted.trim().to_lowercase();
    job_location.contains(&wanted)
        || job_location.contains("remote")
        || wanted
            .split(',')
            .next()
            .map(str::trim)
            .is_some_and(|city| !city.is_empty() && job_location.contains(city))
}

/// Locations that mean "anywhere in the default country" to the APIs.
pub fn is_nationwide(location: &str) -> bool {
    let loc = location.trim().to_lowercase();
    loc.is_empty() || loc == "united states" || loc == "us" || loc == "usa"
}

/// Whitespace-collapsed text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve `href` against `base` (scheme + host, no trailing slash).
pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href)
    }
}

/// Strip HTML tags from API-provided descriptions.
pub fn strip_html(html: &str) -> String {
    let fragment = scraper::Html::parse_fragment(html);
    collapse_whitespace(&fragment.root_element().text().collect::<String>())
}

pub fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_query_words_and_alternatives() {
        assert!(matches_query("Senior Software Engineer", "software engineer"));
        assert!(matches_query("Backend Engineer", "software engineer"));
        assert!(matches_query("Data Analyst", "nurse OR data analyst"));
        assert!(!matches_query("Registered Nurse", "software engineer"));
        assert!(matches_query("Anything", ""));
    }

    #[test]
    fn test_matches_location() {
        assert!(matches_location("Austin, TX", ""));
        assert!(matches_location("Austin, Texas", "Austin, TX"));
        assert!(matches_location("Remote - US", "Denver"));
        assert!(!matches_location("Berlin, Germany", "Austin, TX"));
    }

    #[test]
    fn test_is_nationwide() {
        assert!(is_nationwide(""));
        assert!(is_nationwide("United States"));
        assert!(is_nationwide(" US "));
        assert!(!is_nationwide("Austin, TX"));
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://www.indeed.com", "/viewjob?jk=1"),
            "https://www.indeed.com/viewjob?jk=1"
        );
        assert_eq!(
            absolute_url("https://www.indeed.com/", "https://other.example/x"),
            "https://other.example/x"
        );
        assert_eq!(absolute_url("https://a.example", "jobs/1"), "https://a.example/jobs/1");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Build <b>things</b></p>\n<ul><li>fast</li></ul>"), "Build things fast");
    }

    #[test]
    fn test_from_config_skips_unconfigured_sources() {
        let config = AppConfig {
            job_boards_enabled: false,
            ..Default::default()
        };
        let sources = from_config(&config, reqwest::Client::new());
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["themuse"]);
    }
}
