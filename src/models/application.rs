use std::collections::BTreeMap;

use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::models::question::DetectedQuestion;

/// Applicant identity and materials fed to the automation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationProfile {
    #[garde(length(max = 200))]
    pub full_name: String,
    #[garde(length(max = 100))]
    pub first_name: Option<String>,
    #[garde(length(max = 100))]
    pub last_name: Option<String>,
    #[garde(length(max = 320))]
    pub email: String,
    #[garde(length(max = 50))]
    pub phone: String,
    #[garde(length(max = 200))]
    pub location: Option<String>,
    #[garde(length(max = 500))]
    pub linked_in: Option<String>,
    #[garde(length(max = 500))]
    pub github: Option<String>,
    #[garde(length(max = 500))]
    pub portfolio: Option<String>,
    #[garde(length(max = 20000))]
    pub cover_letter: Option<String>,
    #[garde(length(max = 2048))]
    pub resume_url: Option<String>,
    #[garde(skip)]
    pub resume_base64: Option<String>,
    #[garde(length(max = 255))]
    pub resume_file_name: Option<String>,
}

impl ApplicationProfile {
    /// Explicit first name, else the first word of `full_name`.
    pub fn first_name(&self) -> Option<String> {
        non_blank(self.first_name.as_deref())
            .map(str::to_string)
            .or_else(|| self.full_name.split_whitespace().next().map(str::to_string))
    }

    /// Explicit last name, else everything after the first word of `full_name`.
    pub fn last_name(&self) -> Option<String> {
        if let Some(last) = non_blank(self.last_name.as_deref()) {
            return Some(last.to_string());
        }
        let rest: Vec<&str> = self.full_name.split_whitespace().skip(1).collect();
        if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        }
    }

    pub fn has_resume(&self) -> bool {
        non_blank(self.resume_base64.as_deref()).is_some()
            || non_blank(self.resume_url.as_deref()).is_some()
    }
}

/// Returns the trimmed value when it is present and not blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Body of `POST /api/v1/automate`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AutomateRequest {
    #[garde(length(min = 1, max = 2048))]
    pub job_url: Option<String>,
    #[garde(dive)]
    pub application_data: Option<ApplicationProfile>,
    /// Answers keyed by the detected question's index.
    #[garde(skip)]
    #[serde(default)]
    pub answers: Option<BTreeMap<String, String>>,
    #[garde(length(min = 1, max = 128))]
    pub stream_session_id: Option<String>,
}

/// Applicant tracking systems the engine knows how to recognize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AtsKind {
    Workday,
    Greenhouse,
    Lever,
    SmartRecruiters,
    Jobvite,
    Icims,
    Taleo,
    BambooHr,
    Unknown,
}

/// Outcome of one automation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationResult {
    pub success: bool,
    pub filled_fields: u32,
    pub ats_system: String,
    #[serde(default)]
    pub resume_uploaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<DetectedQuestion>,
    pub needs_user_input: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_o_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_session_id: Option<String>,
}

impl AutomationResult {
    /// Failure result for errors that abort a run.
    pub fn failure(error: impl Into<String>, screenshot: Option<String>) -> Self {
        Self {
            success: false,
            ats_system: AtsKind::Unknown.to_string(),
            screenshot,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
