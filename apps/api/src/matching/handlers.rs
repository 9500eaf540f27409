//! Axum route handlers for the matching API (`/api/v1`).

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::cv::handlers::read_upload;
use crate::errors::AppError;
use crate::matching::models::{CvMetadata, CvUploadResponse, JobDescription, MatchingResponse};
use crate::matching::pipeline;
use crate::state::AppState;

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct MatchParams {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    pub skill: Option<String>,
}

/// Stored points are keyed by UUID; anything else cannot exist.
fn cv_not_found() -> AppError {
    AppError::NotFound("CV not found".to_string())
}

/// POST /api/v1/upload-cv
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CvUploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    info!(filename = %upload.filename, size = upload.bytes.len(), "CV upload received");
    Ok(Json(pipeline::process_upload(&state, upload).await?))
}

/// GET /api/v1/cv/:cv_id
pub async fn handle_get_cv(
    State(state): State<AppState>,
    Path(cv_id): Path<String>,
) -> Result<Json<CvMetadata>, AppError> {
    if Uuid::parse_str(&cv_id).is_err() {
        return Err(cv_not_found());
    }
    let metadata = state.vectors.fetch(&cv_id).await?.ok_or_else(cv_not_found)?;
    Ok(Json(metadata))
}

/// DELETE /api/v1/cv/:cv_id
pub async fn handle_delete_cv(
    State(state): State<AppState>,
    Path(cv_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if Uuid::parse_str(&cv_id).is_err() || state.vectors.fetch(&cv_id).await?.is_none() {
        return Err(cv_not_found());
    }
    state.vectors.delete(&cv_id).await?;
    Ok(Json(json!({ "message": "CV deleted successfully" })))
}

/// POST /api/v1/match-cvs?top_k=10&skill=Rust
pub async fn handle_match_cvs(
    State(state): State<AppState>,
    Query(params): Query<MatchParams>,
    Json(job): Json<JobDescription>,
) -> Result<Json<MatchingResponse>, AppError> {
    let response =
        pipeline::match_job(&state, &job, params.top_k, params.skill.as_deref()).await?;
    info!(
        job_id = %response.job_id,
        matches = response.total_matches,
        "Job matching complete"
    );
    Ok(Json(response))
}

/// GET /api/v1/health
pub async fn handle_matching_health(State(state): State<AppState>) -> Json<Value> {
    match state.vectors.describe().await {
        Ok(stats) => Json(json!({
            "status": "healthy",
            "services": {
                "vector_database": "connected",
                "embedding_service": state.embedder.describe(),
                "gemini_api": "ready",
            },
            "index_stats": stats,
        })),
        Err(e) => {
            error!("Matching health check failed: {e}");
            Json(json!({ "status": "unhealthy", "error": e.to_string() }))
        }
    }
}
