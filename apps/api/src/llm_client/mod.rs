/// LLM client: the single point of entry for all generative-model calls.
///
/// ARCHITECTURAL RULE: No other module may call the model API directly.
/// All LLM interactions MUST go through `ModelDispatcher`, which owns the
/// fallback order and the per-process failed-model set.
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod dispatcher;
pub mod gemini;
pub mod json;
pub mod mock;
pub mod prompts;

#[cfg(test)]
pub mod testing;

pub use dispatcher::{DispatcherSettings, ModelDispatcher};
pub use gemini::GeminiBackend;
pub use json::JsonAnswer;

/// How a single backend attempt failed. Drives the dispatcher's state machine:
/// `QuotaExhausted` and `ModelNotFound` retire the model for the process lifetime,
/// `Other` leaves it available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    QuotaExhausted,
    ModelNotFound,
    Other,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Other, message)
    }

    /// True when the model should never be attempted again in this process.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            BackendErrorKind::QuotaExhausted | BackendErrorKind::ModelNotFound
        )
    }
}

/// Binary payload sent alongside the prompt text (used for image OCR).
#[derive(Debug, Clone)]
pub struct InlineData {
    pub mime_type: String,
    pub data: Bytes,
}

/// A single-turn request to a generative model.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
    pub attachment: Option<InlineData>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, mime_type: impl Into<String>, data: Bytes) -> Self {
        self.attachment = Some(InlineData {
            mime_type: mime_type.into(),
            data,
        });
        self
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Prompt::text(text)
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Prompt::text(text)
    }
}

/// One hosted model API. Implementations make exactly one attempt per call;
/// fallback and retirement are the dispatcher's job.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, BackendError>;
}
