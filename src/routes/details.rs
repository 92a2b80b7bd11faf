use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::application::non_blank;
use crate::models::details::{JobDetails, JobDetailsRequest};
use crate::routes::error::ApiError;

/// POST /api/v1/job-details: salary and labelled sections of a job post.
pub async fn job_details(
    State(state): State<AppState>,
    payload: Result<Json<JobDetailsRequest>, JsonRejection>,
) -> Result<Json<JobDetails>, ApiError> {
    let Json(request) = payload?;
    let Some(job_url) = non_blank(request.job_url.as_deref()) else {
        return Err(ApiError::bad_request("jobUrl is required"));
    };
    request.validate()?;

    Ok(Json(state.details.extract(job_url).await))
}
