use std::str::FromStr;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::llm_client::gemini::DEFAULT_API_BASE;

pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-lite";

/// Priority order tried after the primary model. The duplicate entry is kept as
/// published; the dispatcher de-duplicates.
pub const DEFAULT_FALLBACK_MODELS: &[&str] = &[
    "models/gemini-2.5-flash",
    "models/gemini-2.5-pro",
    "models/gemini-2.0-flash",
    "models/gemini-2.0-flash-001",
    "models/gemini-2.0-flash",
    "models/gemini-2.0-flash-lite-001",
    "models/gemini-2.5-pro-preview-06-05",
    "models/gemini-2.5-pro-preview-05-06",
    "models/gemini-2.0-flash-exp",
    "models/gemini-2.0-pro-exp",
    "models/gemini-exp-1206",
];

/// Application configuration loaded from environment variables.
/// Every value has a default; malformed numbers fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,

    // Generative model
    pub google_api_key: Option<String>,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub gemini_fallback_models: Vec<String>,
    pub debug_mode: bool,
    pub mock_mode: bool,

    // Screening service
    pub pdf_max_size_mb: u64,
    pub pdf_min_text_length: usize,
    pub pdf_max_text_length: usize,
    pub cv_confidence_threshold: f64,
    pub cors_origins: Vec<String>,

    // Matching service
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub vector_collection: String,
    pub embedding_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            port: parse_or(&get, "PORT", 8000)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),

            google_api_key: get("GOOGLE_API_KEY"),
            gemini_api_base: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_fallback_models: get("GEMINI_FALLBACK_MODELS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()),
            debug_mode: get("DEBUG_MODE").is_some_and(|v| is_true(&v)),
            mock_mode: get("MOCK_MODE").is_some_and(|v| is_true(&v)),

            pdf_max_size_mb: parse_or(&get, "PDF_MAX_SIZE_MB", 10)?,
            pdf_min_text_length: parse_or(&get, "PDF_MIN_TEXT_LENGTH", 50)?,
            pdf_max_text_length: parse_or(&get, "PDF_MAX_TEXT_LENGTH", 3000)?,
            cv_confidence_threshold: parse_or(&get, "CV_CONFIDENCE_THRESHOLD", 0.7)?,
            cors_origins: split_list(&get("CORS_ORIGINS").unwrap_or_else(|| "*".to_string())),

            max_file_size: parse_or(&get, "MAX_FILE_SIZE", 5 * 1024 * 1024)?,
            allowed_extensions: split_list(
                &get("ALLOWED_EXTENSIONS").unwrap_or_else(|| "pdf,png,jpg,jpeg,doc,docx".to_string()),
            )
            .into_iter()
            .map(|ext| ext.to_lowercase())
            .collect(),
            qdrant_url: get("QDRANT_URL"),
            qdrant_api_key: get("QDRANT_API_KEY"),
            vector_collection: get("VECTOR_COLLECTION").unwrap_or_else(|| "job-matching".to_string()),
            embedding_url: get("EMBEDDING_URL"),
            embedding_api_key: get("EMBEDDING_API_KEY"),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| "multilingual-e5-large".to_string()),
            embedding_dimension: parse_or(&get, "EMBEDDING_DIMENSION", 1024)?,
        })
    }

    /// Largest request body the router accepts: the bigger of the two upload limits
    /// plus headroom for multipart framing.
    pub fn body_limit(&self) -> usize {
        let screening = (self.pdf_max_size_mb as usize).saturating_mul(1024 * 1024);
        screening.max(self.max_file_size).saturating_add(64 * 1024)
    }

    /// Debug view of the effective settings. Never includes secrets.
    pub fn settings_info(&self) -> Value {
        json!({
            "gemini_model": self.gemini_model,
            "pdf_max_size_mb": self.pdf_max_size_mb,
            "pdf_min_text_length": self.pdf_min_text_length,
            "cv_confidence_threshold": self.cv_confidence_threshold,
            "debug_mode": self.debug_mode,
            "mock_mode": self.mock_mode,
            "api_key_set": self.google_api_key.is_some(),
            "vector_store": if self.qdrant_url.is_some() { "qdrant" } else { "memory" },
            "embedding_model": self.embedding_model,
        })
    }
}

fn parse_or<T>(get: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

fn is_true(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
