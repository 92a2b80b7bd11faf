use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::models::application::non_blank;
use crate::models::job::{ScrapeRequest, ScrapeResponse};
use crate::routes::error::ApiError;
use crate::services::career_page;

/// POST /api/v1/scrape: render a company career page and list its postings.
pub async fn scrape_career_page(
    State(state): State<AppState>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScrapeResponse>), ApiError> {
    let Json(request) = payload?;
    let Some(company_url) = non_blank(request.company_url.as_deref()) else {
        return Err(ApiError::bad_request("companyUrl is required"));
    };
    if reqwest::Url::parse(company_url).is_err() {
        return Err(ApiError::bad_request("companyUrl must be an absolute URL"));
    }

    let response = career_page::scrape(
        state.browser.as_ref(),
        company_url,
        request.keywords.as_deref().unwrap_or_default(),
        request.location.as_deref().unwrap_or_default(),
        state.navigation_timeout,
    )
    .await;

    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(response)))
}
