use bytes::Bytes;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::cv::document::{self, file_info, FileReport};
use crate::cv::models::{
    CvExtractionResponse, CvProfile, CvValidationResponse, JobMatchRequest, JobMatchResponse,
    JobMatchResult,
};
use crate::cv::prompts;
use crate::cv::validation::{calculate_confidence, parse_yes_no};
use crate::errors::AppError;
use crate::llm_client::ModelDispatcher;

const NO_JSON_ERROR: &str = "No JSON object found in model response";

/// A single uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Text pulled from an upload that passed every guard.
struct ReadDocument {
    text: String,
    file_info: FileReport,
}

/// Why an upload was turned away before any model call.
struct Rejection {
    reason: String,
    file_info: FileReport,
}

/// Type / size / emptiness checks, text extraction, then the minimum-length check.
async fn read_document(config: &Config, upload: &Upload) -> Result<ReadDocument, Rejection> {
    let kind = document::validate_file(&upload.bytes, &upload.filename, config.pdf_max_size_mb)
        .map_err(|e| {
            info!(filename = %upload.filename, "Upload rejected: {e}");
            Rejection {
                reason: e.to_string(),
                file_info: FileReport::Rejected {
                    filename: upload.filename.clone(),
                    error: e.to_string(),
                },
            }
        })?;

    let text = document::extract_text(upload.bytes.clone(), kind).await;
    let report = FileReport::Processed(file_info(&upload.bytes, &upload.filename, kind, &text));

    if text.chars().count() < config.pdf_min_text_length {
        return Err(Rejection {
            reason: format!(
                "File contains insufficient text content (minimum {} characters required)",
                config.pdf_min_text_length
            ),
            file_info: report,
        });
    }

    Ok(ReadDocument {
        text,
        file_info: report,
    })
}

/// Decides whether the upload is a CV. Rejected uploads never reach the model.
pub async fn validate_cv(
    llm: &ModelDispatcher,
    config: &Config,
    upload: &Upload,
) -> CvValidationResponse {
    let doc = match read_document(config, upload).await {
        Ok(doc) => doc,
        Err(rejection) => {
            return CvValidationResponse {
                is_cv: false,
                confidence: 0.0,
                reason: rejection.reason,
                file_info: rejection.file_info,
            }
        }
    };

    let prompt = prompts::validation_prompt(&doc.text, config.pdf_max_text_length);
    let answer = llm.generate(prompt).await;

    let (is_cv, reason) = parse_yes_no(&answer);
    let confidence = calculate_confidence(&answer, is_cv);
    info!(filename = %upload.filename, is_cv, confidence, "CV validated");

    CvValidationResponse {
        is_cv,
        confidence,
        reason,
        file_info: doc.file_info,
    }
}

/// Extracts a flat profile from the upload.
pub async fn extract_cv_info(
    llm: &ModelDispatcher,
    config: &Config,
    upload: &Upload,
) -> CvExtractionResponse {
    let doc = match read_document(config, upload).await {
        Ok(doc) => doc,
        Err(rejection) => {
            return CvExtractionResponse {
                success: false,
                extracted_info: None,
                error: Some(rejection.reason),
                raw_response: None,
                file_info: rejection.file_info,
            }
        }
    };

    let prompt = prompts::profile_extraction_prompt(&doc.text, config.pdf_max_text_length);
    match llm.generate_json(prompt).await.decode::<CvProfile>() {
        Ok(profile) => CvExtractionResponse {
            success: true,
            extracted_info: Some(profile),
            error: None,
            raw_response: None,
            file_info: doc.file_info,
        },
        Err(payload) => {
            let (error, raw_response) = split_failure(payload);
            warn!(filename = %upload.filename, "Profile extraction failed: {error}");
            CvExtractionResponse {
                success: false,
                extracted_info: None,
                error: Some(error),
                raw_response,
                file_info: doc.file_info,
            }
        }
    }
}

/// Scores raw CV text against a job description.
pub async fn match_cv_job(
    llm: &ModelDispatcher,
    config: &Config,
    req: &JobMatchRequest,
) -> Result<JobMatchResponse, AppError> {
    if req.cv_text.trim().is_empty() || req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "cv_text and job_description must not be empty".to_string(),
        ));
    }

    let cv_text = prompts::truncate_chars(&req.cv_text, config.pdf_max_text_length);
    let prompt = prompts::job_match_prompt(cv_text, &req.job_description);

    Ok(match llm.generate_json(prompt).await.decode::<JobMatchResult>() {
        Ok(mut result) => {
            result.match_score = result.match_score.clamp(0.0, 100.0);
            JobMatchResponse {
                success: true,
                match_result: Some(result),
                error: None,
                raw_response: None,
            }
        }
        Err(payload) => {
            let (error, raw_response) = split_failure(payload);
            warn!("Job match failed: {error}");
            JobMatchResponse {
                success: false,
                match_result: None,
                error: Some(error),
                raw_response,
            }
        }
    })
}

/// Pulls `error` and `raw_response` out of a failed JSON payload.
fn split_failure(payload: Value) -> (String, Option<String>) {
    let error = payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or(NO_JSON_ERROR)
        .to_string();
    let raw = payload
        .get("raw_response")
        .and_then(Value::as_str)
        .map(str::to_string);
    (error, raw)
}
