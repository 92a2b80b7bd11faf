//! Salary and section extraction from a job post page.
//!
//! Extraction is best effort: an unreachable page or one with no recognizable
//! structure yields empty details rather than an error.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::details::{JobDetails, JobSection};
use crate::services::sources::adzuna::{format_salary, thousands};
use crate::services::sources::{collapse_whitespace, element_text};

const HEADING_SELECTOR: &str = "h2, h3, h4, .section-title, [class*=\"section\"], [class*=\"heading\"]";
const CONTAINER_SELECTOR: &str = "[class*=\"section\"], [class*=\"requirement\"], [class*=\"responsibility\"]";
const CONTAINER_TITLE_SELECTOR: &str = "h2, h3, h4, strong";
const COMPENSATION_SELECTOR: &str = "[itemprop=\"baseSalary\"], [class*=\"salary\"], [class*=\"compensation\"], [class*=\"pay-range\"], [data-testid*=\"salary\"]";

const SECTION_PATTERNS: &[&str] = &[
    "what you'll do",
    "what you will do",
    "what you'll work on",
    "key responsibilities",
    "responsibilities",
    "requirements",
    "essential qualifications",
    "preferred qualifications",
    "qualifications",
    "what we're looking for",
    "benefits",
    "perks",
    "about the role",
    "about the team",
    "about you",
];

const MAX_TITLE_CHARS: usize = 100;
const MAX_COLLECTED_CHARS: usize = 2000;
const MAX_SECTION_CHARS: usize = 1000;
const MIN_SECTION_CHARS: usize = 20;

pub struct DetailsExtractor {
    http: reqwest::Client,
    timeout: Duration,
}

impl DetailsExtractor {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Fetch `url` and extract its details. Never fails.
    pub async fn extract(&self, url: &str) -> JobDetails {
        match self.fetch(url).await {
            Ok(html) => {
                let details = extract_from_html(&html);
                tracing::info!(
                    url,
                    sections = details.sections.len(),
                    has_salary = details.salary.is_some(),
                    "Extracted job details"
                );
                details
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Failed to fetch job post");
                JobDetails::default()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        self.http
            .get(url)
            .timeout(self.timeout)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Salary and labelled sections from a job post's HTML.
pub fn extract_from_html(html: &str) -> JobDetails {
    let document = Html::parse_document(html);
    JobDetails {
        sections: extract_sections(&document),
        salary: extract_salary(&document),
    }
}

fn extract_sections(document: &Html) -> Vec<JobSection> {
    let Ok(heading_sel) = Selector::parse(HEADING_SELECTOR) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut sections = Vec::new();

    for heading in document.select(&heading_sel) {
        let title = element_text(heading);
        if title.is_empty() || title.chars().count() >= MAX_TITLE_CHARS || !is_section_title(&title) {
            continue;
        }
        if !seen.insert(title.to_lowercase()) {
            continue;
        }

        let mut content = sibling_content(heading);
        if content.is_empty() {
            content = parent_content(heading);
        }
        push_section(&mut sections, title, &content);
    }

    if sections.is_empty() {
        sections = container_sections(document);
    }
    sections
}

fn is_section_title(title: &str) -> bool {
    let lower = title.to_lowercase().replace('\u{2019}', "'");
    SECTION_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Text of the siblings after `heading`, up to the next heading.
fn sibling_content(heading: ElementRef<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut len = 0;
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        if is_heading_tag(sibling.value().name()) {
            break;
        }
        let text = element_text(sibling);
        if text.is_empty() {
            continue;
        }
        len += text.len();
        parts.push(text);
        if len >= MAX_COLLECTED_CHARS {
            break;
        }
    }
    truncate_chars(&parts.join("\n"), MAX_COLLECTED_CHARS)
}

/// List items and paragraphs under the heading's parent.
fn parent_content(heading: ElementRef<'_>) -> String {
    let Some(parent) = heading.parent().and_then(ElementRef::wrap) else {
        return String::new();
    };
    let Ok(items) = Selector::parse("p, li") else {
        return String::new();
    };
    let parts: Vec<String> = parent
        .select(&items)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    truncate_chars(&parts.join("\n"), MAX_COLLECTED_CHARS)
}

fn container_sections(document: &Html) -> Vec<JobSection> {
    let (Ok(container_sel), Ok(title_sel), Ok(items)) = (
        Selector::parse(CONTAINER_SELECTOR),
        Selector::parse(CONTAINER_TITLE_SELECTOR),
        Selector::parse("p, li"),
    ) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut sections = Vec::new();
    for container in document.select(&container_sel) {
        let Some(title) = container.select(&title_sel).next().map(element_text) else {
            continue;
        };
        if title.is_empty() || title.chars().count() >= MAX_TITLE_CHARS || !seen.insert(title.to_lowercase()) {
            continue;
        }
        let parts: Vec<String> = container
            .select(&items)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        push_section(&mut sections, title, &parts.join("\n"));
    }
    sections
}

fn push_section(sections: &mut Vec<JobSection>, title: String, content: &str) {
    let content = content.trim();
    if content.chars().count() <= MIN_SECTION_CHARS {
        return;
    }
    sections.push(JobSection {
        id: format!("section_{}_{}", sections.len(), slug(&title)),
        title,
        content: truncate_chars(content, MAX_SECTION_CHARS),
    });
}

fn is_heading_tag(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect::<String>().trim_end().to_string()
}

fn slug(title: &str) -> String {
    let mut slug = String::new();
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

fn extract_salary(document: &Html) -> Option<String> {
    json_ld_salary(document)
        .or_else(|| compensation_element_salary(document))
        .or_else(|| text_salary(&visible_text(document)))
}

/// `baseSalary` of a schema.org `JobPosting` in a JSON-LD block.
fn json_ld_salary(document: &Html) -> Option<String> {
    let selector = Selector::parse("script[type=\"application/ld+json\"]").ok()?;
    document.select(&selector).find_map(|script| {
        let raw: String = script.text().collect();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
        find_base_salary(&value)
    })
}

fn find_base_salary(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Array(items) => items.iter().find_map(find_base_salary),
        serde_json::Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                return find_base_salary(graph);
            }
            let is_posting = match map.get("@type") {
                Some(serde_json::Value::String(t)) => t == "JobPosting",
                Some(serde_json::Value::Array(types)) => types.iter().any(|t| t == "JobPosting"),
                _ => false,
            };
            if !is_posting {
                return None;
            }
            map.get("baseSalary").and_then(format_base_salary)
        }
        _ => None,
    }
}

fn format_base_salary(salary: &serde_json::Value) -> Option<String> {
    let currency = salary
        .get("currency")
        .and_then(|c| c.as_str())
        .unwrap_or("USD");
    let value = salary.get("value").unwrap_or(salary);

    let (min, max) = match number(value) {
        Some(v) => (Some(v), Some(v)),
        None => {
            let exact = value.get("value").and_then(number);
            (
                value.get("minValue").and_then(number).or(exact),
                value.get("maxValue").and_then(number).or(exact),
            )
        }
    };

    let amount = match (min, max) {
        (Some(lo), Some(hi)) if (lo - hi).abs() < f64::EPSILON => Some(format!("${}", thousands(lo))),
        _ => format_salary(min, max),
    }?;
    let amount = if currency.eq_ignore_ascii_case("USD") {
        amount
    } else {
        format!("{} {}", amount.replace('$', ""), currency)
    };

    let unit = value
        .get("unitText")
        .or_else(|| salary.get("unitText"))
        .and_then(|u| u.as_str())
        .map(|u| u.to_lowercase());
    Some(match unit {
        Some(unit) => format!("{} per {}", amount, unit),
        None => amount,
    })
}

fn number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

fn compensation_element_salary(document: &Html) -> Option<String> {
    let selector = Selector::parse(COMPENSATION_SELECTOR).ok()?;
    document.select(&selector).find_map(|element| {
        let text = element_text(element);
        text_salary(&text).or_else(|| {
            (text.chars().any(|c| c.is_ascii_digit()) && text.chars().count() <= 120).then_some(text)
        })
    })
}

fn salary_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // $120,000 - $150,000 (per year)
            r"(?i)\$\s?\d{1,3}(?:,\d{3})+(?:\.\d{2})?\s*(?:-|–|—|to)\s*\$?\s?\d{1,3}(?:,\d{3})+(?:\.\d{2})?(?:\s*(?:per|/)\s*(?:year|yr|annum))?",
            // $120k - $150k
            r"(?i)\$\s?\d{2,3}(?:\.\d)?k\s*(?:-|–|—|to)\s*\$?\s?\d{2,3}(?:\.\d)?k",
            // $25 - $35 per hour
            r"(?i)\$\s?\d{1,3}(?:\.\d{2})?\s*(?:-|–|—|to)\s*\$?\s?\d{1,3}(?:\.\d{2})?\s*(?:/|per)\s*(?:hour|hr)",
            r"(?i)\$\s?\d{1,3}(?:\.\d{2})?\s*(?:/|per)\s*(?:hour|hr)",
            r"(?im)(?:salary|compensation|pay range)\s*:\s*([^\n]{3,80})",
            r"(?i)\$\s?\d{2,3}k\b",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn text_salary(text: &str) -> Option<String> {
    salary_patterns().iter().find_map(|re| {
        let caps = re.captures(text)?;
        let found = caps.get(1).or_else(|| caps.get(0))?;
        let value = collapse_whitespace(found.as_str());
        (!value.is_empty()).then_some(value)
    })
}

/// Body text with one line per text node, skipping scripts and styles.
fn visible_text(document: &Html) -> String {
    let Ok(body_sel) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_sel).next() else {
        return String::new();
    };
    body.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?.value().as_element()?.name();
            (!matches!(parent, "script" | "style" | "noscript")).then(|| text.trim().to_string())
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
