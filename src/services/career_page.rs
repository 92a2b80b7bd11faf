//! Company career page scraping.
//!
//! Career sites built on Workday and similar platforms render their listings
//! client-side, so the page is loaded in the headless browser and the
//! rendered DOM is parsed here with `scraper`.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use uuid::Uuid;

use crate::models::job::{today, JobPosting, ScrapeResponse};
use crate::services::browser::{BrowserDriver, BrowserError};
use crate::services::sources::{element_text, matches_query, non_empty};

/// Candidate selectors for a posting, most specific first. The first one
/// that matches anything on the page is used.
const POSTING_SELECTORS: &[&str] = &[
    "[data-automation-id=\"jobTitle\"]",
    "[data-automation-id=\"jobPosting\"]",
    "[data-automation-id=\"jobPostingTitle\"]",
    "a[href*=\"/jobs/\"]",
    "a[href*=\"/job/\"]",
    "a[href*=\"/careers/\"]",
    "[data-testid=\"job-title\"]",
    "[data-testid=\"job-posting\"]",
    ".job-title",
    ".job-posting",
    ".job-card",
    "li[data-automation-id*=\"job\"]",
    "div[data-automation-id*=\"job\"]",
    "[class*=\"job\"]",
    "[class*=\"posting\"]",
];

const TITLE_SELECTOR: &str = "a, [data-automation-id=\"jobTitle\"], .job-title";
const LINK_SELECTOR: &str = "a[href*=\"/jobs/\"], a[href*=\"/job/\"], a[href]";
const CARD_SELECTOR: &str = "[data-automation-id=\"jobPosting\"], .job-posting, [class*=\"job-card\"], li";
const LOCATION_SELECTOR: &str =
    "[data-automation-id=\"jobLocation\"], [data-automation-id=\"locations\"], .job-location, [class*=\"location\"]";
const DESCRIPTION_SELECTOR: &str =
    "[data-automation-id=\"jobDescription\"], .job-description, [class*=\"description\"]";
const SALARY_SELECTOR: &str =
    "[data-automation-id=\"compensationText\"], .salary, [class*=\"salary\"], [class*=\"compensation\"]";

/// Non-matching postings are only dropped once this many have been kept, so
/// small career pages still return something for loose keyword matches.
const LENIENT_KEYWORD_FLOOR: usize = 20;

/// Company name from a career site URL: the first label of its host name.
pub fn company_from_url(page_url: &str) -> String {
    reqwest::Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .and_then(|h| h.split('.').next().map(str::to_string))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Extract postings from a rendered career page.
pub fn extract_postings(
    html: &str,
    page_url: &str,
    keywords: &str,
    location: &str,
    id_prefix: &str,
) -> Vec<JobPosting> {
    let document = Html::parse_document(html);
    let (Ok(title_sel), Ok(link_sel), Ok(card_sel), Ok(location_sel), Ok(desc_sel), Ok(salary_sel)) = (
        Selector::parse(TITLE_SELECTOR),
        Selector::parse(LINK_SELECTOR),
        Selector::parse(CARD_SELECTOR),
        Selector::parse(LOCATION_SELECTOR),
        Selector::parse(DESCRIPTION_SELECTOR),
        Selector::parse(SALARY_SELECTOR),
    ) else {
        return Vec::new();
    };

    let Some(elements) = POSTING_SELECTORS.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        let found: Vec<ElementRef<'_>> = document.select(&selector).collect();
        (!found.is_empty()).then_some(found)
    }) else {
        tracing::debug!(url = %page_url, "No posting elements found on career page");
        return Vec::new();
    };

    let base = reqwest::Url::parse(page_url).ok();
    let company = company_from_url(page_url);
    let mut seen = std::collections::HashSet::new();
    let mut postings = Vec::new();

    for element in elements {
        let title_element = if element.value().name() == "a" {
            element
        } else {
            element.select(&title_sel).next().unwrap_or(element)
        };
        let title = element_text(title_element);
        if title.chars().count() < 3 {
            continue;
        }

        let href = if element.value().name() == "a" {
            element.value().attr("href")
        } else {
            element
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
        };
        let url = href.and_then(|h| match &base {
            Some(base) => base.join(h).ok().map(|u| u.to_string()),
            None => Some(h.to_string()),
        });

        if !seen.insert((title.clone(), url.clone())) {
            continue;
        }

        let card = std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .find(|e| card_sel.matches(e))
            .or_else(|| element.parent().and_then(ElementRef::wrap))
            .unwrap_or(element);

        let description = card
            .select(&desc_sel)
            .next()
            .map(element_text)
            .and_then(non_empty);

        if !keywords.trim().is_empty()
            && postings.len() >= LENIENT_KEYWORD_FLOOR
            && !matches_query(
                &format!("{} {}", title, description.as_deref().unwrap_or_default()),
                keywords,
            )
        {
            continue;
        }

        let job_location = card
            .select(&location_sel)
            .next()
            .map(element_text)
            .and_then(non_empty)
            .or_else(|| non_empty(location.to_string()))
            .unwrap_or_else(|| "Location not specified".to_string());

        let salary = card
            .select(&salary_sel)
            .next()
            .map(element_text)
            .and_then(non_empty);

        postings.push(JobPosting {
            id: format!("{}_{}", id_prefix, Uuid::new_v4().simple()),
            title,
            company: company.clone(),
            location: job_location,
            posted_date: today(),
            description,
            url,
            salary,
            job_type: None,
        });
    }

    postings
}

/// Render `company_url` in the browser and extract its postings.
///
/// The browser session is closed before returning, whatever the outcome.
pub async fn scrape(
    driver: &dyn BrowserDriver,
    company_url: &str,
    keywords: &str,
    location: &str,
    navigation_timeout: Duration,
) -> ScrapeResponse {
    match scrape_inner(driver, company_url, keywords, location, navigation_timeout).await {
        Ok(jobs) => {
            tracing::info!(url = %company_url, count = jobs.len(), "Scraped career page");
            ScrapeResponse {
                success: true,
                count: jobs.len(),
                jobs,
                error: None,
            }
        }
        Err(e) => {
            tracing::error!(url = %company_url, error = %e, "Career page scrape failed");
            ScrapeResponse {
                success: false,
                jobs: Vec::new(),
                count: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn scrape_inner(
    driver: &dyn BrowserDriver,
    company_url: &str,
    keywords: &str,
    location: &str,
    navigation_timeout: Duration,
) -> Result<Vec<JobPosting>, BrowserError> {
    let page = driver.open().await?;

    let rendered = async {
        page.goto(company_url, navigation_timeout).await?;
        page.wait_for_any(POSTING_SELECTORS, Duration::from_secs(10)).await?;
        page.content().await
    }
    .await;

    if let Err(e) = page.close().await {
        tracing::warn!(error = %e, "Failed to close browser session");
    }

    let html = rendered?;
    Ok(extract_postings(
        &html,
        company_url,
        keywords,
        location,
        &format!("career_{}", company_from_url(company_url)),
    ))
}
