use garde::Validate;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/job-details`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobDetailsRequest {
    #[garde(length(min = 1, max = 2048))]
    pub job_url: Option<String>,
}

/// A labelled block of a job post ("Responsibilities", "Benefits", ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSection {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Extracted job post details. Both fields are empty on failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobDetails {
    pub sections: Vec<JobSection>,
    pub salary: Option<String>,
}
