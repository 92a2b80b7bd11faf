//! Application form automation.
//!
//! One [`AutomationEngine::run`] drives one fresh browser session through a
//! fixed sequence: navigate, check for bot walls and listing pages, fill the
//! known profile fields, upload the resume, then either replay the caller's
//! answers or stop and report unanswered questions, and finally try to
//! submit. The session is closed on every exit path.

pub mod ats;
pub mod fields;
pub mod resume;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use serde_json::json;

use self::ats::{
    board_name, detect_ats, embedded_apply_url, has_bot_wall_phrase, is_followable_href,
    is_job_board_listing, is_oauth_redirect, ANY_FORM_CONTROL, BOT_WALL_ERROR, CAPTCHA_SELECTOR,
    OAUTH_ERROR,
};
use self::fields::{field_specs, looks_confirmed, FieldSpec, Locator, APPLY_LINK_STRATEGIES, SUBMIT_STRATEGIES};
use crate::models::application::{ApplicationProfile, AtsKind, AutomationResult};
use crate::services::browser::{BrowserDriver, BrowserError, BrowserPage};
use crate::services::questions::detect_questions;
use crate::services::stream::{StreamEvent, StreamHub};

/// Pause after navigation and clicks so client-side scripts can render.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// One application run.
#[derive(Debug, Clone)]
pub struct AutomationJob {
    pub job_url: String,
    pub profile: ApplicationProfile,
    /// Answers keyed by detected question index.
    pub answers: BTreeMap<String, String>,
    pub stream_session_id: Option<String>,
}

/// Error type for a run that could not complete.
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("Failed to start browser session: {0}")]
    Launch(#[source] BrowserError),

    #[error("Automation failed: {source}")]
    Run {
        #[source]
        source: BrowserError,
        screenshot: Option<String>,
    },
}

impl AutomationError {
    /// Failure result returned to the caller.
    pub fn into_result(self) -> AutomationResult {
        let message = self.to_string();
        let screenshot = match self {
            Self::Launch(_) => None,
            Self::Run { screenshot, .. } => screenshot,
        };
        AutomationResult::failure(message, screenshot)
    }
}

pub struct AutomationEngine {
    driver: Arc<dyn BrowserDriver>,
    http: reqwest::Client,
    streams: Arc<StreamHub>,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl AutomationEngine {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        http: reqwest::Client,
        streams: Arc<StreamHub>,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            driver,
            http,
            streams,
            navigation_timeout,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Run one application. `Err` means the run aborted; use
    /// [`AutomationError::into_result`] for the caller-facing failure.
    pub async fn run(&self, job: &AutomationJob) -> Result<AutomationResult, AutomationError> {
        let start = Instant::now();
        tracing::info!(job_url = %job.job_url, "Starting application automation");

        let page = match self.driver.open().await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open browser session");
                self.finish_stream(job, None);
                record_run("error", start);
                return Err(AutomationError::Launch(e));
            }
        };

        let outcome = match self.drive(page.as_ref(), job).await {
            Ok(result) => Ok(result),
            Err(source) => {
                tracing::error!(job_url = %job.job_url, error = %source, "Automation run failed");
                let screenshot = capture(page.as_ref()).await;
                Err(AutomationError::Run { source, screenshot })
            }
        };

        if let Err(e) = page.close().await {
            tracing::warn!(error = %e, "Failed to close browser session");
        }

        let label = match &outcome {
            Ok(r) if r.bot_detected == Some(true) => "bot_detected",
            Ok(r) if r.needs_user_input => "needs_input",
            Ok(r) if r.requires_o_auth == Some(true) => "requires_oauth",
            Ok(r) if r.submitted == Some(true) => "submitted",
            Ok(_) => "not_submitted",
            Err(_) => "error",
        };
        record_run(label, start);
        self.finish_stream(job, outcome.as_ref().ok());

        outcome.map(|mut result| {
            result.stream_session_id = job.stream_session_id.clone();
            result
        })
    }

    async fn drive(&self, page: &dyn BrowserPage, job: &AutomationJob) -> Result<AutomationResult, BrowserError> {
        let stream = job
            .stream_session_id
            .as_deref()
            .filter(|id| self.streams.is_connected(id));

        self.emit(stream, StreamEvent::new("navigating", json!({ "url": job.job_url })));
        if let Err(e) = page.goto(&job.job_url, self.navigation_timeout).await {
            tracing::warn!(job_url = %job.job_url, error = %e, "Navigation did not complete, continuing with loaded page");
        }
        self.settle().await;
        let mut url = page.current_url().await?;
        self.frame(page, stream, "navigated", json!({ "url": url })).await;

        let body = page.body_text().await?;
        if (has_bot_wall_phrase(&body) || page.exists(CAPTCHA_SELECTOR).await?)
            && !page.exists(ANY_FORM_CONTROL).await?
        {
            let board = board_name(&url);
            tracing::warn!(url = %url, board, "Bot detection wall, no form available");
            return Ok(AutomationResult {
                success: false,
                ats_system: board.to_lowercase(),
                bot_detected: Some(true),
                error: Some(BOT_WALL_ERROR.to_string()),
                screenshot: capture(page).await,
                ..Default::default()
            });
        }

        let mut content = page.content().await?;
        if is_job_board_listing(&url, &body, &content) && self.follow_apply_link(page, &url, &content).await? {
            url = page.current_url().await?;
            content = page.content().await?;
            tracing::info!(url = %url, "Followed apply link from job board listing");
        }

        let ats = detect_ats(&url, &content);
        tracing::info!(ats = %ats, url = %url, "Detected application system");

        self.emit(stream, StreamEvent::new("filling_form", json!({ "atsSystem": ats })));
        let mut filled_fields = 0u32;
        for spec in field_specs(&job.profile) {
            if fill_field(page, &spec).await {
                filled_fields += 1;
            }
        }

        let resume_uploaded = match resume::attach(page, &self.http, &job.profile).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                tracing::warn!(error = %e, "Resume upload failed");
                false
            }
        };
        if resume_uploaded {
            filled_fields += 1;
        }
        tracing::info!(filled_fields, resume_uploaded, "Known fields filled");
        self.frame(page, stream, "form_filled", json!({ "filledFields": filled_fields })).await;

        if job.answers.is_empty() {
            let questions = detect_questions(&page.form_controls().await?);
            if !questions.is_empty() {
                tracing::info!(count = questions.len(), "Form has questions that need user input");
                return Ok(AutomationResult {
                    success: false,
                    filled_fields,
                    ats_system: ats.to_string(),
                    resume_uploaded,
                    screenshot: capture(page).await,
                    error: Some(format!("{} question(s) need to be answered", questions.len())),
                    questions,
                    needs_user_input: true,
                    ..Default::default()
                });
            }
        } else {
            fill_answers(page, &job.answers).await;
        }

        let submitted = if filled_fields > 0 || resume_uploaded {
            self.submit(page).await
        } else {
            tracing::info!("Nothing was filled, skipping submission");
            false
        };
        if submitted {
            self.frame(page, stream, "submitted", json!({ "action": "clicked_submit" })).await;
        }

        let mut result = AutomationResult {
            success: true,
            filled_fields,
            ats_system: ats.to_string(),
            resume_uploaded,
            submitted: Some(submitted),
            ..Default::default()
        };

        if ats == AtsKind::Lever {
            let final_url = page.current_url().await?;
            if is_oauth_redirect(ats, &final_url) {
                tracing::warn!(url = %final_url, "Application redirected to LinkedIn sign-in");
                if let Err(e) = page.go_back().await {
                    tracing::warn!(error = %e, "Failed to leave sign-in page");
                }
                result.success = false;
                result.requires_o_auth = Some(true);
                result.error = Some(OAUTH_ERROR.to_string());
            }
        }

        result.screenshot = capture(page).await;
        if let Some(frame) = result.screenshot.clone() {
            self.emit(stream, StreamEvent::frame(frame, "completed", json!({})));
        }
        Ok(result)
    }

    /// Leave a listing page for the posting's application form.
    async fn follow_apply_link(&self, page: &dyn BrowserPage, url: &str, content: &str) -> Result<bool, BrowserError> {
        for locator in APPLY_LINK_STRATEGIES {
            if let Locator::Css(selector) = locator {
                if !page.exists(selector).await? {
                    continue;
                }
                if let Some(href) = page.link_href(selector).await? {
                    if is_followable_href(&href) {
                        self.navigate(page, &resolve_href(url, &href)).await;
                        return Ok(true);
                    }
                }
            }
            if activate(page, *locator).await? {
                self.settle().await;
                return Ok(true);
            }
        }

        match embedded_apply_url(content) {
            Some(apply_url) => {
                self.navigate(page, &apply_url).await;
                Ok(true)
            }
            None => {
                tracing::info!(url, "No apply link found on listing page");
                Ok(false)
            }
        }
    }

    /// Try each submit strategy until one acts. Strategy errors are logged
    /// and the next one is tried.
    async fn submit(&self, page: &dyn BrowserPage) -> bool {
        for locator in SUBMIT_STRATEGIES {
            match activate(page, *locator).await {
                Ok(true) => {
                    tracing::info!(strategy = ?locator, "Submit action taken");
                    self.settle().await;
                    match page.body_text().await {
                        Ok(text) => tracing::info!(confirmed = looks_confirmed(&text), "Checked for submission confirmation"),
                        Err(e) => tracing::debug!(error = %e, "Could not read page after submit"),
                    }
                    return true;
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(strategy = ?locator, error = %e, "Submit strategy failed"),
            }
        }
        tracing::warn!("No submit control found");
        false
    }

    async fn navigate(&self, page: &dyn BrowserPage, url: &str) {
        if let Err(e) = page.goto(url, self.navigation_timeout).await {
            tracing::warn!(url, error = %e, "Navigation did not complete, continuing with loaded page");
        }
        self.settle().await;
    }

    async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    fn emit(&self, stream: Option<&str>, event: StreamEvent) {
        if let Some(session_id) = stream {
            self.streams.publish(session_id, event);
        }
    }

    /// Publish a screenshot frame. Screenshots are only taken when someone
    /// is watching.
    async fn frame(&self, page: &dyn BrowserPage, stream: Option<&str>, step: &str, extra: serde_json::Value) {
        if stream.is_none() {
            return;
        }
        if let Some(frame) = capture(page).await {
            self.emit(stream, StreamEvent::frame(frame, step, extra));
        }
    }

    fn finish_stream(&self, job: &AutomationJob, result: Option<&AutomationResult>) {
        let Some(session_id) = job.stream_session_id.as_deref() else {
            return;
        };
        let data = match result {
            Some(r) => json!({
                "success": r.success,
                "filledFields": r.filled_fields,
                "submitted": r.submitted.unwrap_or(false),
                "requiresOAuth": r.requires_o_auth.unwrap_or(false),
                "needsUserInput": r.needs_user_input,
            }),
            None => json!({ "success": false }),
        };
        self.streams.publish(session_id, StreamEvent::new("completed", data));
        self.streams.close(session_id);
    }
}

/// Fill one known field through its locators. Locator errors are logged and
/// the next locator is tried.
async fn fill_field(page: &dyn BrowserPage, spec: &FieldSpec) -> bool {
    for locator in spec.locators() {
        let Locator::Css(selector) = locator else {
            continue;
        };
        match page.fill(selector, &spec.value).await {
            Ok(true) => {
                tracing::debug!(field = %spec.field, selector, "Filled field");
                return true;
            }
            Ok(false) => {}
            Err(e) => tracing::debug!(field = %spec.field, selector, error = %e, "Fill attempt failed"),
        }
    }
    false
}

async fn fill_answers(page: &dyn BrowserPage, answers: &BTreeMap<String, String>) {
    let mut answered = 0usize;
    for (key, value) in answers {
        let Ok(index) = key.trim().parse::<usize>() else {
            tracing::warn!(key = %key, "Ignoring answer with non-numeric question index");
            continue;
        };
        match page.answer_control(index, value).await {
            Ok(true) => answered += 1,
            Ok(false) => tracing::warn!(index, "No control at answer index"),
            Err(e) => tracing::warn!(index, error = %e, "Failed to fill answer"),
        }
    }
    tracing::info!(answered, total = answers.len(), "Answers filled");
}

async fn activate(page: &dyn BrowserPage, locator: Locator) -> Result<bool, BrowserError> {
    match locator {
        Locator::Css(selector) => page.click(selector).await,
        Locator::ButtonText(text) => page.click_text(text).await,
        Locator::FormSubmit => page.submit_form().await,
    }
}

/// Base64 PNG of the viewport, if one can be taken.
async fn capture(page: &dyn BrowserPage) -> Option<String> {
    match page.screenshot().await {
        Ok(png) => Some(base64::engine::general_purpose::STANDARD.encode(png)),
        Err(e) => {
            tracing::warn!(error = %e, "Screenshot failed");
            None
        }
    }
}

fn resolve_href(page_url: &str, href: &str) -> String {
    reqwest::Url::parse(page_url)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

fn record_run(outcome: &'static str, start: Instant) {
    metrics::counter!("automation_runs_total", "outcome" => outcome).increment(1);
    metrics::histogram!("automation_duration_seconds").record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_keeps_screenshot() {
        let error = AutomationError::Run {
            source: BrowserError::Script("form vanished".to_string()),
            screenshot: Some("aGk=".to_string()),
        };
        let result = error.into_result();
        assert!(!result.success);
        assert_eq!(result.ats_system, "unknown");
        assert_eq!(result.screenshot.as_deref(), Some("aGk="));
        assert!(result.error.unwrap().contains("form vanished"));
    }

    #[test]
    fn test_launch_error_has_no_screenshot() {
        let result = AutomationError::Launch(BrowserError::Launch("no chrome".to_string())).into_result();
        assert!(result.screenshot.is_none());
        assert!(result.error.unwrap().starts_with("Failed to start browser session"));
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("https://www.indeed.com/jobs?q=rust", "/apply/123"),
            "https://www.indeed.com/apply/123"
        );
        assert_eq!(
            resolve_href("https://www.indeed.com/jobs", "https://acme.com/apply"),
            "https://acme.com/apply"
        );
    }
}
