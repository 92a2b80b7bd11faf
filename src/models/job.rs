use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A normalized job posting returned by the search endpoint.
///
/// `id` carries a source prefix (`adzuna_`, `greenhouse_`, ...) so ids from
/// different sources never collide inside one result set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub posted_date: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
}

impl JobPosting {
    /// Dedup key: lower-cased, whitespace-collapsed `title|company|location`.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}",
            normalize(&self.title),
            normalize(&self.company),
            normalize(&self.location)
        )
    }

    /// Whether the posting mentions `interest` in its title, company or description.
    pub fn matches_interest(&self, interest: &str) -> bool {
        let needle = interest.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        let haystack = format!(
            "{} {} {}",
            self.title,
            self.company,
            self.description.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        haystack.contains(&needle)
    }
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Today's date in the `YYYY-MM-DD` form used for `posted_date`.
pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Reduce an RFC 3339 / ISO timestamp (or epoch millis) to `YYYY-MM-DD`,
/// falling back to today when the input can't be read.
pub fn posted_date_from(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return today();
    };
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%Y-%m-%d").to_string();
    }
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    today()
}

/// Same as [`posted_date_from`] for sources that report epoch milliseconds.
pub fn posted_date_from_millis(millis: Option<i64>) -> String {
    millis
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|ts| ts.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or_else(today)
}

/// Request body for the career page scraper.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub company_url: Option<String>,
    pub keywords: Option<String>,
    pub location: Option<String>,
}

/// Response body for the career page scraper.
#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub jobs: Vec<JobPosting>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(title: &str, company: &str, location: &str) -> JobPosting {
        JobPosting {
            id: "test_1".to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            posted_date: today(),
            description: None,
            url: None,
            salary: None,
            job_type: None,
        }
    }

    #[test]
    fn test_dedup_key_normalizes_case_and_whitespace() {
        let a = posting("Software  Engineer", "Acme", "Remote");
        let b = posting("software engineer", " ACME ", "remote");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_dedup_key_keeps_fields_apart() {
        let a = posting("Engineer Acme", "", "Remote");
        let b = posting("Engineer", "Acme", "Remote");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_matches_interest() {
        let mut job = posting("Data Analyst", "Acme", "Remote");
        job.description = Some("Work with SQL and dashboards".to_string());
        assert!(job.matches_interest("data"));
        assert!(job.matches_interest("sql"));
        assert!(!job.matches_interest("nurse"));
        assert!(!job.matches_interest("  "));
    }

    #[test]
    fn test_posted_date_from() {
        assert_eq!(posted_date_from(Some("2025-03-14T10:00:00Z")), "2025-03-14");
        assert_eq!(posted_date_from(Some("2025-03-14")), "2025-03-14");
        assert_eq!(posted_date_from(Some("garbage")), today());
        assert_eq!(posted_date_from(None), today());
        assert_eq!(posted_date_from_millis(Some(1_700_000_000_000)), "2023-11-14");
    }
}
