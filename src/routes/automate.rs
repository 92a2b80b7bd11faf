use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::application::{non_blank, AutomateRequest, AutomationResult};
use crate::routes::error::ApiError;
use crate::services::automation::AutomationJob;

/// POST /api/v1/automate: fill (and where possible submit) an application.
///
/// Aborted runs answer 500 with the failure result; all other outcomes,
/// including "needs user input", answer 200.
pub async fn automate_application(
    State(state): State<AppState>,
    payload: Result<Json<AutomateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AutomationResult>), ApiError> {
    let Json(request) = payload?;

    let job_url = non_blank(request.job_url.as_deref()).map(str::to_string);
    let (Some(job_url), Some(profile)) = (job_url, request.application_data.clone()) else {
        return Err(ApiError::bad_request("jobUrl and applicationData are required"));
    };
    request.validate()?;

    let job = AutomationJob {
        job_url,
        profile,
        answers: request.answers.unwrap_or_default(),
        stream_session_id: request.stream_session_id,
    };

    match state.automation.run(&job).await {
        Ok(result) => Ok((StatusCode::OK, Json(result))),
        Err(e) => {
            let mut result = e.into_result();
            result.stream_session_id = job.stream_session_id;
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(result)))
        }
    }
}
