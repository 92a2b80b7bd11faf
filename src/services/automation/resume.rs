use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use uuid::Uuid;

use super::fields::RESUME_INPUTS;
use crate::models::application::{non_blank, ApplicationProfile};
use crate::services::browser::{BrowserError, BrowserPage};

const DEFAULT_FILE_NAME: &str = "resume.pdf";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for resume attachment.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    #[error("Resume payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Resume download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Resume download returned HTTP {0}")]
    Status(u16),

    #[error("Resume temp file error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Attach the profile's resume to the first matching file input.
///
/// Returns `Ok(false)` when the profile has no resume or the page has no
/// file input. The temp file is removed whether or not attaching worked.
pub async fn attach(
    page: &dyn BrowserPage,
    http: &reqwest::Client,
    profile: &ApplicationProfile,
) -> Result<bool, ResumeError> {
    if !profile.has_resume() {
        return Ok(false);
    }

    let Some(selector) = find_file_input(page).await? else {
        tracing::info!("No file input found for resume");
        return Ok(false);
    };

    let (bytes, file_name) = load(http, profile).await?;
    let path = temp_path(&file_name);
    tokio::fs::write(&path, &bytes).await?;

    let attached = page.set_input_file(selector, &path).await;

    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove resume temp file");
    }

    let attached = attached?;
    tracing::info!(selector, file_name = %file_name, bytes = bytes.len(), attached, "Resume upload attempted");
    Ok(attached)
}

async fn find_file_input(page: &dyn BrowserPage) -> Result<Option<&'static str>, BrowserError> {
    for &selector in RESUME_INPUTS {
        if page.exists(selector).await? {
            return Ok(Some(selector));
        }
    }
    Ok(None)
}

/// Resume bytes and file name. The inline payload wins over the URL.
async fn load(http: &reqwest::Client, profile: &ApplicationProfile) -> Result<(Vec<u8>, String), ResumeError> {
    if let Some(payload) = non_blank(profile.resume_base64.as_deref()) {
        let bytes = decode_inline(payload)?;
        let name = non_blank(profile.resume_file_name.as_deref())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        return Ok((bytes, name));
    }

    let url = non_blank(profile.resume_url.as_deref()).unwrap_or_default();
    let response = http.get(url).timeout(DOWNLOAD_TIMEOUT).send().await?;
    if !response.status().is_success() {
        return Err(ResumeError::Status(response.status().as_u16()));
    }
    let bytes = response.bytes().await?.to_vec();
    let name = non_blank(profile.resume_file_name.as_deref())
        .map(str::to_string)
        .or_else(|| file_name_from_url(url))
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    Ok((bytes, name))
}

/// Decode a base64 payload, with or without a `data:` URL prefix.
pub fn decode_inline(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let data = payload
        .split_once("base64,")
        .map(|(_, data)| data)
        .unwrap_or(payload);
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact)
}

fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .next_back()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Keep file names to a safe character set.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn temp_path(file_name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name)))
}
