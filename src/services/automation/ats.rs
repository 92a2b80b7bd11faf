//! Page classification heuristics: which ATS hosts a form, whether a job
//! board blocked the session, and whether the landed page is a search
//! listing rather than an application.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::application::AtsKind;

/// Keywords per ATS, checked in order against the URL and page content.
const ATS_KEYWORDS: &[(AtsKind, &[&str])] = &[
    (AtsKind::Workday, &["workday", "myworkdayjobs"]),
    (AtsKind::Greenhouse, &["greenhouse"]),
    (AtsKind::Lever, &["lever"]),
    (AtsKind::SmartRecruiters, &["smartrecruiters"]),
    (AtsKind::Jobvite, &["jobvite"]),
    (AtsKind::Icims, &["icims"]),
    (AtsKind::Taleo, &["taleo"]),
    (AtsKind::BambooHr, &["bamboohr"]),
];

const BOT_WALL_PHRASES: &[&str] = &[
    "suspicious behaviour",
    "suspicious behavior",
    "unusual behaviour",
    "unusual behavior",
    "automated access detected",
    "bot detected",
    "access denied",
    "blocked",
    "verify you are human",
    "captcha",
];

pub const CAPTCHA_SELECTOR: &str =
    "iframe[src*=\"recaptcha\"], iframe[src*=\"hcaptcha\"], .g-recaptcha, #captcha, [class*=\"captcha\"]";

/// Any fillable control. A bot wall is only reported when none exist.
pub const ANY_FORM_CONTROL: &str = "input:not([type=\"hidden\"]), textarea, select";

pub const BOT_WALL_ERROR: &str =
    "Bot detection: This job board has detected automated access. Please apply manually through the website.";

pub const OAUTH_ERROR: &str = "This application requires LinkedIn authentication. The form was filled, but you need to manually authenticate and submit on the company website.";

const LISTING_HOSTS: &[&str] = &["indeed", "monster", "glassdoor", "ziprecruiter"];

/// Keyword matchers per ATS. Keywords only match as whole words, so
/// "clever" or "leverage" never read as Lever.
fn ats_patterns() -> &'static [(AtsKind, Regex)] {
    static PATTERNS: OnceLock<Vec<(AtsKind, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ATS_KEYWORDS
            .iter()
            .filter_map(|(kind, keywords)| {
                let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
                Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
                    .ok()
                    .map(|re| (*kind, re))
            })
            .collect()
    })
}

/// First ATS whose keyword appears in the URL or page content.
pub fn detect_ats(url: &str, content: &str) -> AtsKind {
    ats_patterns()
        .iter()
        .find(|(_, pattern)| pattern.is_match(url) || pattern.is_match(content))
        .map(|(kind, _)| *kind)
        .unwrap_or(AtsKind::Unknown)
}

pub fn has_bot_wall_phrase(body_text: &str) -> bool {
    let lower = body_text.to_lowercase();
    BOT_WALL_PHRASES.iter().any(|p| lower.contains(p))
}

/// Display name of the job board behind `url`.
pub fn board_name(url: &str) -> &'static str {
    let lower = url.to_lowercase();
    if lower.contains("indeed.com") {
        "Indeed"
    } else if lower.contains("linkedin.com") {
        "LinkedIn"
    } else if lower.contains("glassdoor.com") {
        "Glassdoor"
    } else if lower.contains("ziprecruiter.com") {
        "ZipRecruiter"
    } else {
        "job board"
    }
}

/// Whether the landed page is a job board search listing.
pub fn is_job_board_listing(url: &str, body_text: &str, content: &str) -> bool {
    let lower_url = url.to_lowercase();
    LISTING_HOSTS.iter().any(|h| lower_url.contains(h))
        || body_text.contains("Filter results")
        || body_text.contains("Jobs in")
        || content.contains("job-listing")
        || content.contains("job-card")
}

/// Whether a Lever run was redirected to a LinkedIn sign-in flow.
pub fn is_oauth_redirect(ats: AtsKind, final_url: &str) -> bool {
    let lower = final_url.to_lowercase();
    ats == AtsKind::Lever
        && lower.contains("linkedin.com")
        && ["oauth", "auth", "user-agreement"].iter().any(|m| lower.contains(m))
}

/// Whether `href` can be navigated to directly.
pub fn is_followable_href(href: &str) -> bool {
    let href = href.trim();
    !href.is_empty() && !href.starts_with("javascript:") && !href.contains('#')
}

fn embedded_apply_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r#"https?://[^\s"'<>]*apply[^\s"'<>]*"#,
            r#""applyUrl"\s*:\s*"(https?:[^"]+)""#,
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Apply URL embedded in inline scripts or JSON, for listings whose apply
/// button has no usable link.
pub fn embedded_apply_url(content: &str) -> Option<String> {
    embedded_apply_patterns().iter().find_map(|re| {
        re.captures(content).map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().replace("\\/", "/"))
                .unwrap_or_default()
        })
    })
    .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_ats_by_url_then_content() {
        assert_eq!(
            detect_ats("https://acme.wd5.myworkdayjobs.com/en-US/careers/job/123", ""),
            AtsKind::Workday
        );
        assert_eq!(
            detect_ats("https://boards.greenhouse.io/acme/jobs/1", ""),
            AtsKind::Greenhouse
        );
        assert_eq!(
            detect_ats("https://acme.com/careers/1", "<script src=\"https://jobs.lever.co/embed.js\">"),
            AtsKind::Lever
        );
        assert_eq!(detect_ats("https://acme.com/apply", "<form></form>"), AtsKind::Unknown);
    }

    #[test]
    fn test_detect_ats_ignores_words_containing_keywords() {
        assert_eq!(
            detect_ats("https://clever.com/careers/42", "Leverage your skills"),
            AtsKind::Unknown
        );
        assert_eq!(
            detect_ats("https://jobs.lever.co/acme/123/apply", ""),
            AtsKind::Lever
        );
        assert_eq!(
            detect_ats("https://acme.com/jobs", "<div class=\"lever-jobs-container\">"),
            AtsKind::Lever
        );
    }

    #[test]
    fn test_detect_ats_uses_keyword_order() {
        // Content mentions both; workday is checked first.
        assert_eq!(
            detect_ats("https://x.example", "greenhouse and workday"),
            AtsKind::Workday
        );
    }

    #[test]
    fn test_bot_wall_phrases() {
        assert!(has_bot_wall_phrase("Please verify you are human to continue"));
        assert!(has_bot_wall_phrase("We noticed Unusual Behavior from your network"));
        assert!(!has_bot_wall_phrase("Senior Rust Engineer - Apply now"));
    }

    #[test]
    fn test_board_names() {
        assert_eq!(board_name("https://www.indeed.com/viewjob?jk=1"), "Indeed");
        assert_eq!(board_name("https://www.linkedin.com/jobs/view/1"), "LinkedIn");
        assert_eq!(board_name("https://www.ziprecruiter.com/c/x"), "ZipRecruiter");
        assert_eq!(board_name("https://jobs.example.com"), "job board");
    }

    #[test]
    fn test_listing_detection() {
        assert!(is_job_board_listing("https://www.monster.com/jobs/search?q=rust", "", ""));
        assert!(is_job_board_listing("https://jobs.example.com", "Filter results", ""));
        assert!(is_job_board_listing("https://jobs.example.com", "", "<div class=\"job-card\">"));
        assert!(!is_job_board_listing("https://boards.greenhouse.io/acme/jobs/1", "Apply for this job", "<form>"));
    }

    #[test]
    fn test_oauth_redirect_only_for_lever() {
        let url = "https://www.linkedin.com/oauth/v2/authorization?client_id=x";
        assert!(is_oauth_redirect(AtsKind::Lever, url));
        assert!(!is_oauth_redirect(AtsKind::Greenhouse, url));
        assert!(!is_oauth_redirect(AtsKind::Lever, "https://jobs.lever.co/acme/1/thanks"));
    }

    #[test]
    fn test_followable_href() {
        assert!(is_followable_href("https://acme.com/apply"));
        assert!(!is_followable_href("javascript:void(0)"));
        assert!(!is_followable_href("#apply"));
        assert!(!is_followable_href(""));
    }

    #[test]
    fn test_embedded_apply_url() {
        let html = r#"<script>window.job = {"applyUrl":"https:\/\/acme.com\/jobs\/1"};</script>"#;
        assert_eq!(embedded_apply_url(html).as_deref(), Some("https://acme.com/jobs/1"));

        let html = r#"<a data-x="https://acme.com/apply/123">"#;
        assert_eq!(embedded_apply_url(html).as_deref(), Some("https://acme.com/apply/123"));

        assert_eq!(embedded_apply_url("<p>no links</p>"), None);
    }
}
