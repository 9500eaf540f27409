//! Upload pipeline (file → text → structured CV → embedding → vector store) and
//! job matching pipeline (job → embedding → nearest CVs → per-candidate analysis).

use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::cv::document::{self, extension, image_mime_type, DocumentKind};
use crate::cv::prompts::{structured_extraction_prompt, IMAGE_OCR};
use crate::cv::service::Upload;
use crate::errors::AppError;
use crate::llm_client::Prompt;
use crate::matching::analysis::{candidate_analysis_prompt, parse_analysis};
use crate::matching::embedding::{cv_profile_text, job_text};
use crate::matching::models::{
    CvMatch, CvMetadata, CvUploadResponse, ExtractedCv, JobDescription, MatchingResponse,
};
use crate::state::AppState;

pub const MAX_TOP_K: usize = 100;

/// Extension allow-list and size limit of the matching service.
fn accepts(state: &AppState, upload: &Upload) -> bool {
    let allowed = extension(&upload.filename)
        .is_some_and(|ext| state.config.allowed_extensions.iter().any(|a| *a == ext));
    allowed && upload.bytes.len() <= state.config.max_file_size
}

/// Plain text of the upload: local parsing for PDF/DOCX, model OCR for images.
async fn upload_text(state: &AppState, upload: &Upload) -> Result<String, AppError> {
    let Some(kind) = DocumentKind::from_filename(&upload.filename) else {
        return Err(AppError::Validation("Unsupported file format".to_string()));
    };

    let text = match kind {
        DocumentKind::Pdf | DocumentKind::Docx => {
            match document::try_extract_text(upload.bytes.clone(), kind).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(filename = %upload.filename, "Text extraction failed: {e}");
                    String::new()
                }
            }
        }
        DocumentKind::Image => {
            let mime = image_mime_type(&upload.filename).unwrap_or("image/jpeg");
            let prompt = Prompt::text(IMAGE_OCR).with_attachment(mime, upload.bytes.clone());
            match state.llm.try_generate(prompt).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(filename = %upload.filename, "Image text extraction failed: {e}");
                    String::new()
                }
            }
        }
    };

    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No text could be extracted from the file".to_string(),
        ));
    }
    Ok(text)
}

pub async fn process_upload(state: &AppState, upload: Upload) -> Result<CvUploadResponse, AppError> {
    let started = Instant::now();

    if !accepts(state, &upload) {
        return Err(AppError::Validation("Invalid file format or size".to_string()));
    }

    let raw_text = upload_text(state, &upload).await?;
    info!(filename = %upload.filename, chars = raw_text.chars().count(), "Extracted CV text");

    let mut extracted: ExtractedCv = state
        .llm
        .generate_json(structured_extraction_prompt(&raw_text))
        .await
        .decode()
        .map_err(|payload| {
            let error = payload
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("No JSON object found in model response");
            AppError::Llm(format!("Cannot extract structured data: {error}"))
        })?;
    extracted.raw_text = raw_text;

    let vector = state.embedder.embed(&cv_profile_text(&extracted)).await?;

    let cv_id = Uuid::new_v4().to_string();
    let metadata = CvMetadata::from_cv(&cv_id, &extracted);
    state.vectors.upsert(&cv_id, vector, &metadata).await?;
    info!(cv_id = %cv_id, "CV processed and stored");

    Ok(CvUploadResponse {
        cv_id,
        extracted_data: extracted,
        processing_time: started.elapsed().as_secs_f64(),
        message: "CV processed and stored successfully".to_string(),
    })
}

/// Deterministic id for a job posting.
pub fn job_id(job: &JobDescription) -> Uuid {
    let key = format!("{}{}", job.title, job.description);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

pub async fn match_job(
    state: &AppState,
    job: &JobDescription,
    top_k: usize,
    skill: Option<&str>,
) -> Result<MatchingResponse, AppError> {
    let started = Instant::now();

    if top_k == 0 || top_k > MAX_TOP_K {
        return Err(AppError::Validation(format!(
            "top_k must be between 1 and {MAX_TOP_K}"
        )));
    }

    let vector = state.embedder.embed(&job_text(job)).await?;
    let hits = state.vectors.query(vector, (top_k * 2) as u64, skill).await?;
    info!(job = %job.title, candidates = hits.len(), "Vector search complete");

    let mut matches: Vec<CvMatch> = Vec::with_capacity(top_k.min(hits.len()));
    for hit in hits.into_iter().take(top_k) {
        let answer = state
            .llm
            .generate(candidate_analysis_prompt(job, &hit.metadata))
            .await;
        let analysis = parse_analysis(&answer);
        if analysis.score.is_none() {
            warn!(cv_id = %hit.cv_id, "Analysis had no score, using vector similarity");
        }
        matches.push(analysis.into_match(hit.cv_id, hit.score));
    }

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ok(MatchingResponse {
        job_id: job_id(job).to_string(),
        total_matches: matches.len(),
        matches,
        processing_time: started.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::config::Config;
    use crate::cv::document::test_docs::{docx_with_body, paragraph};
    use crate::llm_client::testing::ScriptedBackend;
    use crate::llm_client::{DispatcherSettings, ModelDispatcher};
    use crate::matching::embedding::HashingEmbedder;
    use crate::matching::vector_store::{MemoryStore, VectorStore};

    const EXTRACTION_ANSWER: &str = r#"{
        "personal_info": {"full_name": "Jane Doe", "email": "jane@example.com"},
        "experiences": [{"company": "Acme", "position": "Backend Engineer"}],
        "education": [],
        "skills": ["Rust", "Tokio"],
        "certifications": ["CKA"]
    }"#;

    fn state_with(backend: ScriptedBackend) -> (Arc<ScriptedBackend>, AppState) {
        state_with_mode(backend, false)
    }

    fn state_with_mode(backend: ScriptedBackend, mock_mode: bool) -> (Arc<ScriptedBackend>, AppState) {
        let backend = Arc::new(backend);
        let config = Config::from_lookup(|key| match key {
            "EMBEDDING_DIMENSION" => Some("64".to_string()),
            _ => None,
        })
        .unwrap();
        let llm = ModelDispatcher::new(
            backend.clone(),
            DispatcherSettings {
                primary_model: "m".into(),
                fallback_models: vec![],
                mock_mode,
                debug_mode: false,
            },
        );
        let state = AppState {
            llm: Arc::new(llm),
            embedder: Arc::new(HashingEmbedder::new(64)),
            vectors: Arc::new(MemoryStore::new("test", 64)),
            config,
        };
        (backend, state)
    }

    fn job() -> JobDescription {
        JobDescription {
            title: "Rust Engineer".into(),
            description: "Backend services in Rust".into(),
            requirements: "Rust, Tokio".into(),
            benefits: None,
            location: Some("Remote".into()),
            salary_min: None,
            salary_max: None,
            job_type: None,
        }
    }

    fn docx_upload() -> Upload {
        Upload {
            filename: "jane.docx".into(),
            bytes: Bytes::from(docx_with_body(&paragraph(
                "Jane Doe, Backend Engineer at Acme. Skills: Rust, Tokio.",
            ))),
        }
    }

    #[tokio::test]
    async fn test_upload_stores_metadata() {
        let (_, state) = state_with(ScriptedBackend::new().answer("m", EXTRACTION_ANSWER));

        let response = process_upload(&state, docx_upload()).await.unwrap();

        assert_eq!(response.message, "CV processed and stored successfully");
        assert!(response.extracted_data.raw_text.contains("Jane Doe"));
        let stored = state.vectors.fetch(&response.cv_id).await.unwrap().unwrap();
        assert_eq!(stored.full_name, "Jane Doe");
        assert_eq!(stored.skills, vec!["Rust", "Tokio"]);
        assert_eq!(stored.experience_count, 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_extension() {
        let (backend, state) = state_with(ScriptedBackend::new());
        let upload = Upload {
            filename: "cv.txt".into(),
            bytes: Bytes::from_static(b"hello"),
        };
        let err = process_upload(&state, upload).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Invalid file format or size"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_legacy_doc() {
        let (_, state) = state_with(ScriptedBackend::new());
        let upload = Upload {
            filename: "cv.doc".into(),
            bytes: Bytes::from_static(b"legacy"),
        };
        let err = process_upload(&state, upload).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Unsupported file format"));
    }

    #[tokio::test]
    async fn test_unreadable_document_is_unprocessable() {
        let (backend, state) = state_with(ScriptedBackend::new());
        let upload = Upload {
            filename: "broken.docx".into(),
            bytes: Bytes::from_static(b"not a zip archive"),
        };
        let err = process_upload(&state, upload).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::UnprocessableEntity(ref m) if m == "No text could be extracted from the file"
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_with_invalid_json_is_an_llm_error() {
        let (_, state) = state_with(ScriptedBackend::new().answer("m", "{ not json }"));
        let err = process_upload(&state, docx_upload()).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(ref m) if m.contains("Invalid JSON response")));
        assert_eq!(state.vectors.describe().await.unwrap().total_vectors, 0);
    }

    #[tokio::test]
    async fn test_image_upload_is_sent_to_model_with_attachment() {
        let (backend, state) = state_with(
            ScriptedBackend::new().answer("m", "Jane Doe\nRust engineer"),
        );
        let upload = Upload {
            filename: "scan.png".into(),
            bytes: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
        };

        // The scripted model answers every prompt with the OCR text, so
        // structured extraction finds no JSON.
        let err = process_upload(&state, upload).await.unwrap_err();

        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(backend.prompts()[0], IMAGE_OCR);
        assert!(backend.prompts()[1].contains("Jane Doe\nRust engineer"));
    }

    #[tokio::test]
    async fn test_image_upload_during_outage_is_unprocessable() {
        let (backend, state) = state_with(ScriptedBackend::new());
        let upload = Upload {
            filename: "scan.png".into(),
            bytes: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
        };

        let err = process_upload(&state, upload).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::UnprocessableEntity(ref m) if m == "No text could be extracted from the file"
        ));
        assert_eq!(backend.prompts(), vec![IMAGE_OCR.to_string()]);
    }

    #[tokio::test]
    async fn test_mock_mode_upload_stores_canned_cv() {
        let (_, state) = state_with_mode(ScriptedBackend::new(), true);

        let response = process_upload(&state, docx_upload()).await.unwrap();

        assert_eq!(response.extracted_data.personal("full_name"), Some("John Smith"));
        assert!(response.extracted_data.raw_text.contains("Jane Doe"));
        let stored = state.vectors.fetch(&response.cv_id).await.unwrap().unwrap();
        assert_eq!(stored.education_count, 1);
        assert_eq!(stored.experience_count, 1);
    }

    #[tokio::test]
    async fn test_mock_mode_image_upload_succeeds() {
        let (_, state) = state_with_mode(ScriptedBackend::new(), true);
        let upload = Upload {
            filename: "scan.jpg".into(),
            bytes: Bytes::from_static(&[0xFF, 0xD8, 0xFF]),
        };

        let response = process_upload(&state, upload).await.unwrap();

        assert_eq!(response.message, "CV processed and stored successfully");
        assert_eq!(response.extracted_data.skills.len(), 4);
    }

    #[tokio::test]
    async fn test_match_on_empty_store_returns_no_matches() {
        let (backend, state) = state_with(ScriptedBackend::new());
        let response = match_job(&state, &job(), 10, None).await.unwrap();
        assert_eq!(response.total_matches, 0);
        assert!(response.matches.is_empty());
        assert_eq!(response.job_id, job_id(&job()).to_string());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_match_sorts_by_analysis_score() {
        let (backend, state) = state_with(ScriptedBackend::new());
        let embedder = HashingEmbedder::new(64);
        for (id, name, skills) in [
            ("cv-a", "Alice", vec!["Rust"]),
            ("cv-b", "Bob", vec!["Go"]),
        ] {
            let meta = CvMetadata {
                cv_id: id.into(),
                full_name: name.into(),
                skills: skills.into_iter().map(String::from).collect(),
                ..Default::default()
            };
            state
                .vectors
                .upsert(id, embedder.embed_sync(&format!("{name} rust backend")), &meta)
                .await
                .unwrap();
        }

        backend.set(
            "m",
            crate::llm_client::testing::Scripted::Answer(
                "SCORE: 64\nSUMMARY: Decent fit".to_string(),
            ),
        );
        let response = match_job(&state, &job(), 5, None).await.unwrap();

        assert_eq!(response.total_matches, 2);
        assert!(response.matches.iter().all(|m| m.score == 64.0));
        assert_eq!(response.matches[0].summary, "Decent fit");
        assert_eq!(response.matches[0].experience_match, "Not analyzed");
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_match_limits_analysis_to_top_k_and_filters_by_skill() {
        let (backend, state) = state_with(ScriptedBackend::new().answer("m", "SCORE: 10"));
        let embedder = HashingEmbedder::new(64);
        for (id, skill) in [("cv-1", "Rust"), ("cv-2", "Rust"), ("cv-3", "Go")] {
            let meta = CvMetadata {
                cv_id: id.into(),
                skills: vec![skill.to_string()],
                ..Default::default()
            };
            state
                .vectors
                .upsert(id, embedder.embed_sync(&format!("{id} {skill}")), &meta)
                .await
                .unwrap();
        }

        let response = match_job(&state, &job(), 1, Some("Rust")).await.unwrap();
        assert_eq!(response.total_matches, 1);
        assert_ne!(response.matches[0].cv_id, "cv-3");
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_match_rejects_zero_top_k() {
        let (_, state) = state_with(ScriptedBackend::new());
        let err = match_job(&state, &job(), 0, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_job_id_is_deterministic() {
        assert_eq!(job_id(&job()), job_id(&job()));
        let mut other = job();
        other.title = "Go Engineer".into();
        assert_ne!(job_id(&job()), job_id(&other));
    }
}
