//! Chromium over the DevTools protocol (`chromiumoxide`).
//!
//! Every [`BrowserDriver::open`] launches its own headless Chromium process
//! with a throwaway profile directory, so concurrent runs never share cookies
//! or storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{BrowserDriver, BrowserError, BrowserPage, CONTROL_QUERY};
use crate::config::AppConfig;
use crate::models::question::FormControl;

/// How a session is launched.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub chrome_executable: Option<String>,
    pub proxy_server: Option<String>,
    pub user_agent: String,
}

impl LaunchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chrome_executable: config.chrome_executable.clone(),
            proxy_server: config.proxy_server(),
            user_agent: config.user_agent.clone(),
        }
    }
}

pub struct ChromiumDriver {
    settings: LaunchSettings,
}

impl ChromiumDriver {
    pub fn new(settings: LaunchSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn open(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let profile_dir = std::env::temp_dir().join(format!("job-autopilot-{}", Uuid::new_v4()));

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(&profile_dir)
            .window_size(1366, 768)
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");
        if let Some(proxy) = &self.settings.proxy_server {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        if let Some(executable) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "chromiumoxide handler event error");
                }
            }
        });

        match prepare_page(&browser, &self.settings.user_agent).await {
            Ok(page) => {
                tracing::debug!("Browser session opened");
                Ok(Box::new(ChromiumSession {
                    browser: Mutex::new(Some(browser)),
                    page,
                    handler_task,
                    profile_dir,
                }))
            }
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    tracing::warn!(error = %close_err, "Failed to close browser after setup error");
                }
                let _ = browser.wait().await;
                handler_task.abort();
                let _ = tokio::fs::remove_dir_all(&profile_dir).await;
                Err(e)
            }
        }
    }
}

async fn prepare_page(browser: &Browser, user_agent: &str) -> Result<Page, BrowserError> {
    let page = browser.new_page("about:blank").await?;
    page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await?;
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
        .await?;
    Ok(page)
}

/// One launched browser process and its single working page.
pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl Drop for ChromiumSession {
    /// Kills a browser that [`BrowserPage::close`] never reached, e.g. when a
    /// request future is cancelled mid-run.
    fn drop(&mut self) {
        self.handler_task.abort();
        let Some(mut browser) = self.browser.get_mut().take() else {
            return;
        };
        tracing::warn!("Browser session dropped without close, killing it");

        let profile_dir = self.profile_dir.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Some(Err(e)) = browser.kill().await {
                        tracing::warn!(error = %e, "Failed to kill abandoned browser");
                    }
                    let _ = tokio::fs::remove_dir_all(&profile_dir).await;
                });
            }
            Err(_) => {
                drop(browser);
                let _ = std::fs::remove_dir_all(&profile_dir);
            }
        }
    }
}

/// Hides the most common automation tells before any page script runs.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
"#;

/// Shared helpers available to every page function.
const HELPERS_JS: &str = r#"
const isVisible = (el) => {
  if (!el) return false;
  const style = window.getComputedStyle(el);
  if (style.visibility === 'hidden' || style.display === 'none') return false;
  return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
};
const fire = (el) => {
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
};
const setValue = (el, value) => {
  const proto = el.tagName === 'TEXTAREA'
    ? HTMLTextAreaElement.prototype
    : el.tagName === 'SELECT' ? HTMLSelectElement.prototype : HTMLInputElement.prototype;
  const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
  if (descriptor && descriptor.set) {
    descriptor.set.call(el, value);
  } else {
    el.value = value;
  }
};
const text = (el) => (el && el.textContent ? el.textContent.trim() : '');
const nonEmpty = (s) => (s && s.length > 0 ? s : null);
const labelFor = (el) => {
  if (!el.id) return null;
  try {
    const label = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
    return label ? nonEmpty(text(label)) : null;
  } catch (e) {
    return null;
  }
};
const queryAll = (selector) => {
  try {
    return Array.from(document.querySelectorAll(selector));
  } catch (e) {
    return [];
  }
};
"#;

const EXISTS_JS: &str = "function(selector) { return queryAll(selector).length > 0; }";

const ANY_EXISTS_JS: &str =
    "function(selectors) { return selectors.some((s) => queryAll(s).length > 0); }";

const BODY_TEXT_JS: &str =
    "function() { return document.body ? (document.body.innerText || '') : ''; }";

const LINK_HREF_JS: &str = r#"function(selector) {
  const el = queryAll(selector)[0];
  if (!el) return '';
  return el.href || el.getAttribute('href') || '';
}"#;

const FILL_JS: &str = r#"function(selector, value) {
  const blocked = ['file', 'checkbox', 'radio', 'hidden', 'submit', 'button', 'image', 'reset'];
  const el = queryAll(selector).find((c) =>
    isVisible(c) && !c.disabled && !c.readOnly && !blocked.includes((c.type || '').toLowerCase()));
  if (!el) return false;
  el.focus();
  setValue(el, value);
  fire(el);
  el.blur();
  return true;
}"#;

const CLICK_JS: &str = r#"function(selector) {
  const el = queryAll(selector)[0];
  if (!el) return false;
  el.click();
  return true;
}"#;

const CLICK_TEXT_JS: &str = r#"function(wanted) {
  const needle = wanted.toLowerCase();
  const el = queryAll('button, input[type="submit"], a, [role="button"]').find((c) =>
    isVisible(c) && (c.innerText || c.value || '').trim().toLowerCase().includes(needle));
  if (!el) return false;
  el.click();
  return true;
}"#;

const SUBMIT_FORM_JS: &str = r#"function() {
  const form = document.querySelector('form');
  if (!form) return false;
  form.submit();
  return true;
}"#;

const FORM_CONTROLS_JS: &str = r#"function(query) {
  return queryAll(query).map((el, index) => {
    const tag = el.tagName.toLowerCase();
    const type = (el.type || '').toLowerCase();
    const wrapping = el.closest('label');
    const fieldset = el.closest('fieldset');
    const legend = fieldset ? fieldset.querySelector('legend') : null;

    let preceding = null;
    if (type === 'radio') {
      const container = el.closest('div, li, label, p');
      const prev = container ? container.previousElementSibling : null;
      preceding = prev ? nonEmpty(text(prev)) : null;
    } else if (el.parentElement && el.parentElement.previousElementSibling) {
      preceding = nonEmpty(text(el.parentElement.previousElementSibling));
    }

    let parentText = null;
    if (el.parentElement) {
      const nodes = Array.from(el.parentElement.childNodes)
        .filter((n) => n.nodeType === 3)
        .map((n) => n.textContent.trim())
        .filter((t) => t.length > 0);
      parentText = nodes.length > 0 ? nodes[0] : null;
    }

    let optionLabel = null;
    if (type === 'radio') {
      optionLabel = labelFor(el);
      if (!optionLabel) {
        const next = el.nextSibling;
        if (next && next.nodeType === 3 && next.textContent.trim()) {
          optionLabel = next.textContent.trim();
        } else if (el.parentElement) {
          optionLabel = nonEmpty(text(el.parentElement));
        }
      }
    }

    const options = tag === 'select'
      ? Array.from(el.querySelectorAll('option'))
          .filter((o) => o.value)
          .map((o) => ({ value: o.value, text: text(o) }))
      : [];

    return {
      index,
      tag,
      inputType: type || 'text',
      name: el.name || '',
      id: el.id || '',
      value: el.value || '',
      checked: !!el.checked,
      required: !!el.required || el.hasAttribute('required'),
      placeholder: el.placeholder || '',
      className: typeof el.className === 'string' ? el.className : '',
      inNavigation: el.closest('nav, header, [role="navigation"], [class*="nav"], [class*="header"], [class*="search"]') !== null,
      inForm: el.closest('form, [role="form"], [class*="form"], [class*="application"], [class*="apply"], [data-testid*="form"], [data-testid*="application"]') !== null,
      inNonFormArea: el.closest('footer, aside, [role="complementary"], [class*="sidebar"], [class*="footer"]') !== null,
      labelForText: labelFor(el),
      wrappingLabelText: wrapping ? nonEmpty(text(wrapping)) : null,
      legendText: legend ? nonEmpty(text(legend)) : null,
      precedingText: preceding,
      parentText,
      options,
      optionLabel,
    };
  });
}"#;

const ANSWER_JS: &str = r#"function(query, index, answer) {
  const controls = queryAll(query);
  if (index < 0 || index >= controls.length) return false;
  const el = controls[index];
  const type = (el.type || '').toLowerCase();
  const wanted = answer.trim().toLowerCase();

  if (type === 'radio') {
    const group = el.name
      ? queryAll('input[type="radio"]').filter((r) => r.name === el.name)
      : [el];
    const optionText = (r) => (labelFor(r) || (r.parentElement ? text(r.parentElement) : '')).toLowerCase();
    const match = group.find((r) => r.value.toLowerCase() === wanted)
      || group.find((r) => optionText(r) === wanted);
    if (!match) return false;
    match.checked = true;
    fire(match);
    return true;
  }

  if (type === 'checkbox') {
    el.checked = ['true', 'yes', 'on', '1'].includes(wanted);
    fire(el);
    return true;
  }

  if (el.tagName === 'SELECT') {
    const options = Array.from(el.options);
    const option = options.find((o) => o.value === answer)
      || options.find((o) => o.textContent.trim().toLowerCase() === wanted);
    if (!option) return false;
    setValue(el, option.value);
    fire(el);
    return true;
  }

  setValue(el, answer);
  fire(el);
  return true;
}"#;

/// Wrap a page function with the helpers and apply it to JSON arguments.
fn invoke(function: &str, args: &[serde_json::Value]) -> String {
    let args = args
        .iter()
        .map(serde_json::Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "(function() {{ {} return ({})({}); }})()",
        HELPERS_JS, function, args
    )
}

impl ChromiumSession {
    /// Page functions return JSON values; a bare `null` result does not
    /// deserialize, so functions return `''` or `false` instead.
    async fn eval<T: DeserializeOwned>(
        &self,
        function: &str,
        args: &[serde_json::Value],
    ) -> Result<T, BrowserError> {
        let result = self.page.evaluate(invoke(function, args)).await?;
        result
            .into_value::<T>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

#[async_trait]
impl BrowserPage for ChromiumSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(result) => result.map(|_| ()).map_err(BrowserError::from),
            Err(_) => Err(BrowserError::Timeout(timeout, url.to_string())),
        }
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        let page = &self.page;
        page.evaluate("history.back()").await?;
        let wait = Duration::from_secs(10);
        if tokio::time::timeout(wait, page.wait_for_navigation()).await.is_err() {
            tracing::debug!("No navigation after history.back()");
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    async fn body_text(&self) -> Result<String, BrowserError> {
        self.eval(BODY_TEXT_JS, &[]).await
    }

    async fn exists(&self, selector: &str) -> Result<bool, BrowserError> {
        self.eval(EXISTS_JS, &[selector.into()]).await
    }

    async fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Result<bool, BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let selectors = serde_json::json!(selectors);
        loop {
            if self.eval::<bool>(ANY_EXISTS_JS, &[selectors.clone()]).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn link_href(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        let href: String = self.eval(LINK_HREF_JS, &[selector.into()]).await?;
        Ok(Some(href).filter(|h| !h.is_empty()))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        self.eval(FILL_JS, &[selector.into(), value.into()]).await
    }

    async fn click(&self, selector: &str) -> Result<bool, BrowserError> {
        if !self.exists(selector).await? {
            return Ok(false);
        }
        // A real mouse click first; elements without a layout box fall back
        // to a DOM click.
        let clicked = match self.page.find_element(selector).await {
            Ok(element) => element.click().await.is_ok(),
            Err(_) => false,
        };
        if clicked {
            return Ok(true);
        }
        self.eval(CLICK_JS, &[selector.into()]).await
    }

    async fn click_text(&self, text: &str) -> Result<bool, BrowserError> {
        self.eval(CLICK_TEXT_JS, &[text.into()]).await
    }

    async fn submit_form(&self) -> Result<bool, BrowserError> {
        self.eval(SUBMIT_FORM_JS, &[]).await
    }

    async fn set_input_file(&self, selector: &str, path: &Path) -> Result<bool, BrowserError> {
        if !self.exists(selector).await? {
            return Ok(false);
        }
        let page = &self.page;
        let element = page.find_element(selector).await?;
        let mut params = SetFileInputFilesParams::new(vec![path.to_string_lossy().into_owned()]);
        params.backend_node_id = Some(element.backend_node_id);
        page.execute(params).await?;
        Ok(true)
    }

    async fn form_controls(&self) -> Result<Vec<FormControl>, BrowserError> {
        self.eval(FORM_CONTROLS_JS, &[CONTROL_QUERY.into()]).await
    }

    async fn answer_control(&self, index: usize, value: &str) -> Result<bool, BrowserError> {
        self.eval(ANSWER_JS, &[CONTROL_QUERY.into(), index.into(), value.into()])
            .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "Waiting for browser exit failed");
        }
        self.handler_task.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            tracing::debug!(error = %e, "Failed to remove browser profile dir");
        }
        tracing::debug!("Browser session closed");
        closed.map(|_| ()).map_err(BrowserError::from)
    }
}
