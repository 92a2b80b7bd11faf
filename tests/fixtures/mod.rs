//! Test fixtures: applicant profiles, form snapshots and pages.
#![allow(dead_code)]

use job_autopilot::models::application::ApplicationProfile;
use job_autopilot::models::job::{today, JobPosting};
use job_autopilot::models::question::FormControl;

pub const GREENHOUSE_URL: &str = "https://boards.greenhouse.io/acme/jobs/4012345";
pub const LEVER_URL: &str = "https://jobs.lever.co/acme/8f1c2d3e/apply";

/// Selectors a typical Greenhouse form answers to.
pub const GREENHOUSE_FIELDS: &[&str] = &[
    "input[name=\"first_name\"]",
    "input[name=\"last_name\"]",
    "input[type=\"email\"]",
    "input[type=\"tel\"]",
];

pub const SUBMIT_BUTTON: &str = "button[type=\"submit\"]";
pub const FILE_INPUT: &str = "input[type=\"file\"]";

/// "%PDF-" in base64.
pub const TINY_PDF_BASE64: &str = "JVBERi0=";

pub fn profile() -> ApplicationProfile {
    ApplicationProfile {
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        ..Default::default()
    }
}

pub fn profile_with_resume() -> ApplicationProfile {
    ApplicationProfile {
        resume_base64: Some(TINY_PDF_BASE64.to_string()),
        resume_file_name: Some("Ada Lovelace CV.pdf".to_string()),
        ..profile()
    }
}

/// A custom free-text question the engine cannot answer.
pub fn custom_question(index: usize) -> FormControl {
    FormControl {
        index,
        tag: "textarea".to_string(),
        input_type: "textarea".to_string(),
        name: format!("job_application[answers_attributes][{}][text_value]", index),
        id: format!("question_{}", index),
        required: true,
        in_form: true,
        label_for_text: Some("Why do you want to work at Acme?".to_string()),
        ..Default::default()
    }
}

/// An optional email field that must never be surfaced as a question.
pub fn optional_email(index: usize) -> FormControl {
    FormControl {
        index,
        tag: "input".to_string(),
        input_type: "email".to_string(),
        name: "secondary_email".to_string(),
        in_form: true,
        label_for_text: Some("Secondary email address".to_string()),
        ..Default::default()
    }
}

pub fn posting(id: &str, title: &str, company: &str, location: &str) -> JobPosting {
    JobPosting {
        id: id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        posted_date: today(),
        description: None,
        url: Some(format!("https://jobs.example.com/{}", id)),
        salary: None,
        job_type: None,
    }
}

pub const CAREER_PAGE: &str = r#"
<html><body>
  <ul>
    <li data-automation-id="jobPosting">
      <a data-automation-id="jobTitle" href="/en-US/careers/job/Austin/Rust-Engineer_R100">Rust Engineer</a>
      <dd data-automation-id="locations">Austin, TX</dd>
    </li>
    <li data-automation-id="jobPosting">
      <a data-automation-id="jobTitle" href="/en-US/careers/job/Remote/Data-Analyst_R101">Data Analyst</a>
      <dd data-automation-id="locations">Remote</dd>
    </li>
  </ul>
</body></html>
"#;

pub const JOB_POST: &str = r#"
<html><body>
  <h1>Platform Engineer</h1>
  <h2>Responsibilities</h2>
  <ul><li>Own the deployment pipeline end to end</li><li>Keep p99 latency low</li></ul>
  <h2>Benefits</h2>
  <ul><li>Full health, dental and vision coverage</li></ul>
  <p>Compensation: $140,000 - $170,000 per year</p>
</body></html>
"#;
