use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::models::job::JobPosting;
use crate::services::aggregator::SearchParams;

/// Query string of `GET /api/v1/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct JobSearchQuery {
    pub keywords: Option<String>,
    pub location: Option<String>,
    /// JSON array of interests, possibly URL-encoded a second time.
    pub career_interests: Option<String>,
}

/// GET /api/v1/jobs: aggregated search across every configured source.
///
/// Always answers 200 with a JSON array. A query string that doesn't
/// deserialize is searched with defaults.
pub async fn search_jobs(
    State(state): State<AppState>,
    query: Result<Query<JobSearchQuery>, QueryRejection>,
) -> Json<Vec<JobPosting>> {
    metrics::counter!("job_search_requests_total").increment(1);

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Unreadable job search query, using defaults");
            JobSearchQuery::default()
        }
    };

    let params = SearchParams {
        keywords: non_blank(query.keywords),
        location: non_blank(query.location),
        career_interests: parse_career_interests(query.career_interests.as_deref()),
    };
    tracing::info!(
        keywords = ?params.keywords,
        location = ?params.location,
        interests = params.career_interests.len(),
        "Job search requested"
    );

    Json(state.aggregator.search(&params).await)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the `career_interests` parameter. Anything unparsable counts as no
/// interests.
pub fn parse_career_interests(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Vec::new();
    };

    let mut candidate = raw.to_string();
    for _ in 0..3 {
        if let Ok(interests) = serde_json::from_str::<Vec<String>>(&candidate) {
            return interests
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect();
        }
        let decoded = match urlencoding::decode(&candidate) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => break,
        };
        if decoded == candidate {
            break;
        }
        candidate = decoded;
    }

    tracing::warn!(raw, "Ignoring unparsable career_interests");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        assert_eq!(
            parse_career_interests(Some(r#"["Data Science", " ", "Design"]"#)),
            vec!["Data Science", "Design"]
        );
    }

    #[test]
    fn test_parse_encoded_once_and_twice() {
        let once = "%5B%22Nursing%22%2C%22Healthcare%22%5D";
        assert_eq!(parse_career_interests(Some(once)), vec!["Nursing", "Healthcare"]);

        let twice = "%255B%2522Nursing%2522%255D";
        assert_eq!(parse_career_interests(Some(twice)), vec!["Nursing"]);
    }

    #[test]
    fn test_blank_parameters_count_as_absent() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" rust ".to_string())).as_deref(), Some("rust"));
    }

    #[test]
    fn test_unparsable_is_empty() {
        assert!(parse_career_interests(Some("nursing")).is_empty());
        assert!(parse_career_interests(Some("%E0%A4%A")).is_empty());
        assert!(parse_career_interests(Some("")).is_empty());
        assert!(parse_career_interests(None).is_empty());
    }
}
