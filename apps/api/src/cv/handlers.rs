//! Axum route handlers for the screening API.

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::cv::models::{CvExtractionResponse, CvValidationResponse, JobMatchRequest, JobMatchResponse};
use crate::cv::service::{self, Upload};
use crate::errors::AppError;
use crate::state::AppState;

/// Reads the multipart `file` field. Other fields are ignored.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
        return Ok(Upload { filename, bytes });
    }

    Err(AppError::Validation("Missing multipart field 'file'".to_string()))
}

/// POST /validate_cv
pub async fn handle_validate_cv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CvValidationResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(Json(service::validate_cv(&state.llm, &state.config, &upload).await))
}

/// POST /extract_cv_info
pub async fn handle_extract_cv_info(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CvExtractionResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(Json(service::extract_cv_info(&state.llm, &state.config, &upload).await))
}

/// POST /match_cv_job
pub async fn handle_match_cv_job(
    State(state): State<AppState>,
    Json(req): Json<JobMatchRequest>,
) -> Result<Json<JobMatchResponse>, AppError> {
    let response = service::match_cv_job(&state.llm, &state.config, &req).await?;
    Ok(Json(response))
}
