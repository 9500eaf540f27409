//! Gemini `generateContent` REST backend.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendError, BackendErrorKind, ModelBackend, Prompt};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlinePart<'a> },
}

#[derive(Debug, Serialize)]
struct InlinePart<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Client for the Google Generative Language API.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, api_base: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, BackendError> {
        let mut parts = vec![Part::Text { text: &prompt.text }];
        if let Some(attachment) = &prompt.attachment {
            parts.push(Part::Inline {
                inline_data: InlinePart {
                    mime_type: &attachment.mime_type,
                    data: general_purpose::STANDARD.encode(&attachment.data),
                },
            });
        }
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
        };

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::other(format!("HTTP error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &raw));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::other(format!("Malformed response: {e}")))?;

        debug!(model, "generateContent succeeded");
        parsed
            .text()
            .ok_or_else(|| BackendError::other("Model returned empty content"))
    }
}

/// Maps an unsuccessful HTTP response onto a `BackendErrorKind` using the status code
/// first and the API's canonical `error.status` second.
pub fn classify_failure(status: StatusCode, body: &str) -> BackendError {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let api_status = parsed.as_ref().and_then(|e| e.error.status.as_deref());

    let kind = match (status, api_status) {
        (StatusCode::TOO_MANY_REQUESTS, _) | (_, Some("RESOURCE_EXHAUSTED")) => {
            BackendErrorKind::QuotaExhausted
        }
        (StatusCode::NOT_FOUND, _) | (_, Some("NOT_FOUND")) => BackendErrorKind::ModelNotFound,
        _ => BackendErrorKind::Other,
    };

    let message = parsed
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    BackendError::new(kind, format!("status {}: {}", status.as_u16(), message))
}
