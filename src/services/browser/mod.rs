//! Headless browser abstraction used by the automation engine and the career
//! page scraper.
//!
//! A [`BrowserDriver`] opens one isolated [`BrowserPage`] per caller. The
//! caller owns that page for its whole run and must call
//! [`BrowserPage::close`] on every exit path.

pub mod chromium;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::question::FormControl;

/// Every interactive control a question can be detected on or answered in.
/// The detector and the answer filler enumerate the same list so a question's
/// index refers to the same element in both.
pub const CONTROL_QUERY: &str =
    "input:not([type=\"hidden\"]):not([type=\"submit\"]):not([type=\"button\"]):not([type=\"file\"]), textarea, select";

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launch a fresh browser session with a blank page.
    async fn open(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;
}

/// One page in a live browser session.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn go_back(&self) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Serialized DOM of the current page.
    async fn content(&self) -> Result<String, BrowserError>;

    /// `innerText` of the document body.
    async fn body_text(&self) -> Result<String, BrowserError>;

    async fn exists(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Wait until any of `selectors` matches. Returns false on timeout.
    async fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Result<bool, BrowserError>;

    /// `href` of the first element matching `selector`.
    async fn link_href(&self, selector: &str) -> Result<Option<String>, BrowserError>;

    /// Set `value` on the first visible, enabled text-like control matching
    /// `selector` and fire `input` and `change`. Returns false when there is
    /// no such control.
    async fn fill(&self, selector: &str, value: &str) -> Result<bool, BrowserError>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Click the first visible button or link whose text contains `text`.
    async fn click_text(&self, text: &str) -> Result<bool, BrowserError>;

    /// Submit the first form on the page.
    async fn submit_form(&self) -> Result<bool, BrowserError>;

    /// Attach a local file to the first file input matching `selector`.
    async fn set_input_file(&self, selector: &str, path: &Path) -> Result<bool, BrowserError>;

    /// Snapshot every control in [`CONTROL_QUERY`] order.
    async fn form_controls(&self) -> Result<Vec<FormControl>, BrowserError>;

    /// Put `value` into the control at `index` of [`CONTROL_QUERY`]. Radio
    /// controls check the group member whose value or label matches.
    async fn answer_control(&self, index: usize, value: &str) -> Result<bool, BrowserError>;

    /// PNG screenshot of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// Error type for browser operations.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("DevTools protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    #[error("Page script failed: {0}")]
    Script(String),
}
