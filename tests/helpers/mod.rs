//! Test helper utilities: an in-memory browser, stub job sources and an
//! in-process server.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use job_autopilot::app_state::AppState;
use job_autopilot::models::job::{today, JobPosting};
use job_autopilot::models::question::FormControl;
use job_autopilot::services::aggregator::JobAggregator;
use job_autopilot::services::automation::ats::ANY_FORM_CONTROL;
use job_autopilot::services::automation::AutomationEngine;
use job_autopilot::services::browser::{BrowserDriver, BrowserError, BrowserPage};
use job_autopilot::services::job_details::DetailsExtractor;
use job_autopilot::services::sources::{JobSource, SourceError};
use job_autopilot::services::stream::StreamHub;

/// What the fake page looks like and how it reacts.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    /// URL reported after navigation. Defaults to the requested URL.
    pub landed_url: Option<String>,
    /// URL reported after any click or form submit.
    pub url_after_click: Option<String>,
    pub body_text: String,
    pub content: String,
    /// Selectors `fill` succeeds on.
    pub fillable: Vec<&'static str>,
    /// Selectors (or button texts) `click`/`click_text` succeed on.
    pub clickable: Vec<&'static str>,
    /// Selectors matching a file input.
    pub file_inputs: Vec<&'static str>,
    /// Other selectors `exists` reports as present.
    pub present: Vec<&'static str>,
    pub hrefs: Vec<(&'static str, &'static str)>,
    pub controls: Vec<FormControl>,
    pub fail_navigation: bool,
    /// Name of a page operation that fails with a script error, or `open`.
    pub fail_on: Option<&'static str>,
    /// Name of a page operation that never completes.
    pub stall_on: Option<&'static str>,
}

/// A fake [`BrowserDriver`] that records actions and counts open sessions.
pub struct FakeBrowser {
    script: PageScript,
    open_sessions: Arc<AtomicUsize>,
    sessions_started: AtomicUsize,
    actions: Arc<Mutex<Vec<String>>>,
}

impl FakeBrowser {
    pub fn new(script: PageScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            open_sessions: Arc::new(AtomicUsize::new(0)),
            sessions_started: AtomicUsize::new(0),
            actions: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions_started.load(Ordering::SeqCst)
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    pub fn did(&self, prefix: &str) -> bool {
        self.actions().iter().any(|a| a.starts_with(prefix))
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn open(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        if self.script.fail_on == Some("open") {
            return Err(BrowserError::Launch("chrome not found".to_string()));
        }
        self.sessions_started.fetch_add(1, Ordering::SeqCst);
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            script: self.script.clone(),
            url: Mutex::new("about:blank".to_string()),
            closed: AtomicBool::new(false),
            open_sessions: Arc::clone(&self.open_sessions),
            actions: Arc::clone(&self.actions),
        }))
    }
}

struct FakePage {
    script: PageScript,
    url: Mutex<String>,
    closed: AtomicBool,
    open_sessions: Arc<AtomicUsize>,
    actions: Arc<Mutex<Vec<String>>>,
}

impl FakePage {
    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    fn check(&self, operation: &str) -> Result<(), BrowserError> {
        if self.script.fail_on == Some(operation) {
            return Err(BrowserError::Script(format!("{} exploded", operation)));
        }
        Ok(())
    }

    async fn stall(&self, operation: &str) {
        if self.script.stall_on == Some(operation) {
            self.record(format!("stalled:{}", operation));
            std::future::pending::<()>().await;
        }
    }

    fn after_click(&self) {
        if let Some(url) = &self.script.url_after_click {
            *self.url.lock().unwrap() = url.clone();
        }
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.record(format!("goto:{}", url));
        *self.url.lock().unwrap() = self
            .script
            .landed_url
            .clone()
            .unwrap_or_else(|| url.to_string());
        if self.script.fail_navigation {
            return Err(BrowserError::Timeout(timeout, url.to_string()));
        }
        Ok(())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        self.record("go_back".to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        self.check("current_url")?;
        Ok(self.url.lock().unwrap().clone())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.check("content")?;
        Ok(self.script.content.clone())
    }

    async fn body_text(&self) -> Result<String, BrowserError> {
        self.check("body_text")?;
        self.stall("body_text").await;
        Ok(self.script.body_text.clone())
    }

    async fn exists(&self, selector: &str) -> Result<bool, BrowserError> {
        self.check("exists")?;
        if selector == ANY_FORM_CONTROL {
            return Ok(!self.script.fillable.is_empty() || !self.script.controls.is_empty());
        }
        Ok([
            &self.script.fillable,
            &self.script.clickable,
            &self.script.file_inputs,
            &self.script.present,
        ]
        .iter()
        .any(|list| list.iter().any(|s| *s == selector)))
    }

    async fn wait_for_any(&self, selectors: &[&str], _timeout: Duration) -> Result<bool, BrowserError> {
        self.check("wait_for_any")?;
        Ok(!selectors.is_empty())
    }

    async fn link_href(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        Ok(self
            .script
            .hrefs
            .iter()
            .find(|(s, _)| *s == selector)
            .map(|(_, href)| href.to_string()))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        self.check("fill")?;
        let filled = self.script.fillable.iter().any(|s| *s == selector);
        if filled {
            self.record(format!("fill:{}={}", selector, value));
        }
        Ok(filled)
    }

    async fn click(&self, selector: &str) -> Result<bool, BrowserError> {
        let clicked = self.script.clickable.iter().any(|s| *s == selector);
        if clicked {
            self.record(format!("click:{}", selector));
            self.after_click();
        }
        Ok(clicked)
    }

    async fn click_text(&self, text: &str) -> Result<bool, BrowserError> {
        let clicked = self.script.clickable.iter().any(|s| *s == text);
        if clicked {
            self.record(format!("click_text:{}", text));
            self.after_click();
        }
        Ok(clicked)
    }

    async fn submit_form(&self) -> Result<bool, BrowserError> {
        let submitted = self.script.present.contains(&"form");
        if submitted {
            self.record("submit_form".to_string());
            self.after_click();
        }
        Ok(submitted)
    }

    async fn set_input_file(&self, selector: &str, path: &Path) -> Result<bool, BrowserError> {
        let attached = self.script.file_inputs.iter().any(|s| *s == selector);
        self.record(format!(
            "set_input_file:{}:{}:{}",
            selector,
            path.exists(),
            path.display()
        ));
        Ok(attached)
    }

    async fn form_controls(&self) -> Result<Vec<FormControl>, BrowserError> {
        self.check("form_controls")?;
        self.stall("form_controls").await;
        Ok(self.script.controls.clone())
    }

    async fn answer_control(&self, index: usize, value: &str) -> Result<bool, BrowserError> {
        self.record(format!("answer:{}={}", index, value));
        Ok(index < self.script.controls.len())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.check("screenshot")?;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
            self.record("close".to_string());
        }
        Ok(())
    }
}

impl Drop for FakePage {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
            self.record("dropped".to_string());
        }
    }
}

/// A job source with canned behaviour.
pub enum StubSource {
    Returns(&'static str, Vec<JobPosting>),
    Fails(&'static str),
    /// One posting titled with the query it was asked for.
    Echoes(&'static str),
}

#[async_trait]
impl JobSource for StubSource {
    fn name(&self) -> &str {
        match self {
            Self::Returns(name, _) | Self::Fails(name) | Self::Echoes(name) => name,
        }
    }

    async fn fetch(&self, query: &str, location: &str) -> Result<Vec<JobPosting>, SourceError> {
        match self {
            Self::Returns(_, jobs) => Ok(jobs.clone()),
            Self::Echoes(name) => Ok(vec![JobPosting {
                id: format!("{}_{}", name, query.replace(' ', "-")),
                title: query.to_string(),
                company: "Echo".to_string(),
                location: location.to_string(),
                posted_date: today(),
                description: None,
                url: None,
                salary: None,
                job_type: None,
            }]),
            Self::Fails(name) => Err(SourceError::Payload {
                source_name: name.to_string(),
                message: "upstream unavailable".to_string(),
            }),
        }
    }
}

/// Engine over `browser` with no settle delay.
pub fn test_engine(browser: &Arc<FakeBrowser>, streams: Arc<StreamHub>) -> AutomationEngine {
    let driver: Arc<dyn BrowserDriver> = browser.clone();
    AutomationEngine::new(driver, reqwest::Client::new(), streams, Duration::from_secs(5))
        .with_settle_delay(Duration::ZERO)
}

pub fn test_state(sources: Vec<Arc<dyn JobSource>>, browser: &Arc<FakeBrowser>) -> AppState {
    let streams = Arc::new(StreamHub::new());
    let aggregator = JobAggregator::new(sources, Duration::from_millis(500), 100);
    let engine = test_engine(browser, Arc::clone(&streams));
    let details = DetailsExtractor::new(reqwest::Client::new(), Duration::from_secs(5));
    let driver: Arc<dyn BrowserDriver> = browser.clone();
    AppState::new(aggregator, engine, details, streams, driver, Duration::from_secs(5))
}

/// Serve `state` on an ephemeral port and return its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    let app = job_autopilot::build_router(state, None);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}
