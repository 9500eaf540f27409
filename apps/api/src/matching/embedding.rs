//! Sentence embeddings for CV profiles and job descriptions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::models::{ExtractedCv, JobDescription};

#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    ApiRequestFailed(String),

    #[error("embedding service rate limited the request")]
    RateLimited,

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("expected {expected}-dimensional embedding, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    fn dimension(&self) -> usize;

    /// Short label for health output.
    fn describe(&self) -> String;
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP embedder (OpenAI-compatible /v1/embeddings)
// ────────────────────────────────────────────────────────────────────────────

pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: String,
        dimension: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let body = EmbeddingRequest {
            input: vec![text],
            model: &self.model,
        };

        let mut request = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbedderError::ApiRequestFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbedderError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedderError::ApiRequestFailed(format!("HTTP {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::InvalidResponse(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedderError::InvalidResponse("empty response".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbedderError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn describe(&self) -> String {
        format!("http:{}", self.model)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hashing embedder (offline, deterministic)
// ────────────────────────────────────────────────────────────────────────────

/// Feature-hashing bag of words, L2-normalised. No semantic understanding, but
/// texts sharing vocabulary land close together, which is enough for mock mode
/// and tests.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let index = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn describe(&self) -> String {
        "hashing".to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text renderings
// ────────────────────────────────────────────────────────────────────────────

fn push_labelled(parts: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        parts.push(format!("{label}: {v}"));
    }
}

fn push_list(parts: &mut Vec<String>, label: &str, values: &[String]) {
    if !values.is_empty() {
        parts.push(format!("{label}: {}", values.join(", ")));
    }
}

/// Profile text embedded for a CV. Sections without content are skipped.
pub fn cv_profile_text(cv: &ExtractedCv) -> String {
    let mut parts = Vec::new();

    push_labelled(&mut parts, "Name", cv.personal("full_name"));
    push_list(&mut parts, "Skills", &cv.skills);

    for exp in &cv.experiences {
        let mut section = Vec::new();
        push_labelled(&mut section, "Position", exp.position.as_deref());
        push_labelled(&mut section, "Company", exp.company.as_deref());
        push_labelled(&mut section, "Description", exp.description.as_deref());
        push_list(&mut section, "Achievements", &exp.achievements);
        if !section.is_empty() {
            parts.push(section.join(" "));
        }
    }

    for edu in &cv.education {
        let mut section = Vec::new();
        push_labelled(&mut section, "Degree", edu.degree.as_deref());
        push_labelled(&mut section, "Field", edu.field_of_study.as_deref());
        push_labelled(&mut section, "Institution", edu.institution.as_deref());
        if !section.is_empty() {
            parts.push(section.join(" "));
        }
    }

    for project in &cv.projects {
        let mut section = Vec::new();
        push_labelled(&mut section, "Project", project.name.as_deref());
        push_labelled(&mut section, "Description", project.description.as_deref());
        push_list(&mut section, "Technologies", &project.technologies);
        if !section.is_empty() {
            parts.push(section.join(" "));
        }
    }

    push_list(&mut parts, "Certifications", &cv.certifications);

    parts.join(" ")
}

pub fn job_text(job: &JobDescription) -> String {
    let mut parts = vec![
        format!("Job Title: {}", job.title),
        format!("Description: {}", job.description),
        format!("Requirements: {}", job.requirements),
    ];
    push_labelled(&mut parts, "Benefits", job.benefits.as_deref());
    push_labelled(&mut parts, "Location", job.location.as_deref());
    push_labelled(&mut parts, "Job Type", job.job_type.as_deref());
    parts.join(" ")
}
