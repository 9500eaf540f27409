//! Model-fallback dispatcher.
//!
//! Per model id the state machine is:
//!
//! ```text
//! available --quota / not-found--> failed   (terminal for the process)
//! available --any other error----> available
//! ```
//!
//! Candidate order is the sticky current model, then the configured list
//! (`primary ++ fallbacks`, de-duplicated) in priority order, minus failed models.
//! Callers always get text back; a total outage degrades to a mock answer, a debug
//! error string, or a fixed "unavailable" message.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info, warn};

use super::json::JsonAnswer;
use super::mock::mock_response;
use super::prompts::CONNECTIVITY_PROBE;
use super::{BackendErrorKind, ModelBackend, Prompt};

pub const UNAVAILABLE_MESSAGE: &str = "AI service temporarily unavailable. Please try again later.";

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub primary_model: String,
    pub fallback_models: Vec<String>,
    pub mock_mode: bool,
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub current_model: String,
    pub available_models: Vec<String>,
    pub failed_models: Vec<String>,
    pub total_models: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub reachable: bool,
    pub model: Option<String>,
    pub last_error: Option<String>,
}

struct ModelState {
    current: String,
    failed: HashSet<String>,
}

struct Answered {
    model: String,
    text: String,
}

pub struct ModelDispatcher {
    backend: Arc<dyn ModelBackend>,
    models: Vec<String>,
    mock_mode: bool,
    debug_mode: bool,
    state: Mutex<ModelState>,
}

impl ModelDispatcher {
    pub fn new(backend: Arc<dyn ModelBackend>, settings: DispatcherSettings) -> Self {
        let mut seen = HashSet::new();
        let models: Vec<String> = std::iter::once(settings.primary_model.clone())
            .chain(settings.fallback_models)
            .filter(|m| !m.trim().is_empty() && seen.insert(m.clone()))
            .collect();

        Self {
            backend,
            models,
            mock_mode: settings.mock_mode,
            debug_mode: settings.debug_mode,
            state: Mutex::new(ModelState {
                current: settings.primary_model,
                failed: HashSet::new(),
            }),
        }
    }

    /// Sends `prompt` to the first model that answers. Never fails.
    pub async fn generate(&self, prompt: impl Into<Prompt>) -> String {
        let prompt = prompt.into();
        match self.dispatch(&prompt).await {
            Ok(answered) => answered.text,
            Err(last_error) => self.degraded_answer(&prompt, &last_error),
        }
    }

    /// Like `generate`, but a total outage is reported as `Err(last_error)` instead
    /// of a degraded text. Mock mode still answers with its canned text.
    pub async fn try_generate(&self, prompt: impl Into<Prompt>) -> Result<String, String> {
        let prompt = prompt.into();
        match self.dispatch(&prompt).await {
            Ok(answered) => Ok(answered.text),
            Err(_) if self.mock_mode => Ok(mock_response(&prompt.text).to_string()),
            Err(last_error) => Err(last_error),
        }
    }

    /// Same dispatch as `generate`, then extracts the JSON object from the answer.
    pub async fn generate_json(&self, prompt: impl Into<Prompt>) -> JsonAnswer {
        let answer = self.generate(prompt).await;
        JsonAnswer::from_answer(&answer)
    }

    /// Sends a minimal prompt through the normal candidate order to classify the
    /// model API as reachable or not. Mock mode does not count as reachable.
    pub async fn probe(&self) -> ProbeResult {
        match self.dispatch(&Prompt::text(CONNECTIVITY_PROBE)).await {
            Ok(answered) => ProbeResult {
                reachable: true,
                model: Some(answered.model),
                last_error: None,
            },
            Err(last_error) => ProbeResult {
                reachable: false,
                model: None,
                last_error: Some(last_error),
            },
        }
    }

    pub fn current_model(&self) -> String {
        self.state.lock().current.clone()
    }

    pub fn status_info(&self) -> ModelStatus {
        let state = self.state.lock();
        let mut failed: Vec<String> = state.failed.iter().cloned().collect();
        failed.sort();
        ModelStatus {
            current_model: state.current.clone(),
            available_models: self
                .models
                .iter()
                .filter(|m| !state.failed.contains(*m))
                .cloned()
                .collect(),
            failed_models: failed,
            total_models: self.models.len(),
        }
    }

    /// Current model first, then configured priority order, minus failed models.
    fn candidates(&self) -> Vec<String> {
        let state = self.state.lock();
        std::iter::once(&state.current)
            .chain(self.models.iter().filter(|m| **m != state.current))
            .filter(|m| !state.failed.contains(*m))
            .cloned()
            .collect()
    }

    async fn dispatch(&self, prompt: &Prompt) -> Result<Answered, String> {
        let mut last_error: Option<String> = None;

        for model in self.candidates() {
            // Another request may have retired this model since the snapshot.
            if self.state.lock().failed.contains(&model) {
                continue;
            }

            info!(model = %model, "Trying model");
            match self.backend.generate(&model, prompt).await {
                Ok(text) => {
                    self.state.lock().current = model.clone();
                    info!(model = %model, "Model answered");
                    return Ok(Answered { model, text });
                }
                Err(e) => {
                    let detail = match e.kind {
                        BackendErrorKind::QuotaExhausted => {
                            warn!(model = %model, "Quota exhausted, retiring model");
                            format!("Quota exhausted: {}", e.message)
                        }
                        BackendErrorKind::ModelNotFound => {
                            warn!(model = %model, "Model not available, retiring model");
                            format!("Model not found: {}", e.message)
                        }
                        BackendErrorKind::Other => {
                            warn!(model = %model, error = %e.message, "Model call failed");
                            e.message.clone()
                        }
                    };
                    if e.is_terminal() {
                        self.state.lock().failed.insert(model);
                    }
                    last_error = Some(detail);
                }
            }
        }

        let last_error = last_error.unwrap_or_else(|| "no models available".to_string());
        error!("All models failed. Last error: {last_error}");
        Err(last_error)
    }

    fn degraded_answer(&self, prompt: &Prompt, last_error: &str) -> String {
        if self.mock_mode {
            return mock_response(&prompt.text).to_string();
        }
        if self.debug_mode {
            format!("AI ERROR: All models failed. Last error: {last_error}")
        } else {
            UNAVAILABLE_MESSAGE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock;
    use crate::llm_client::testing::{Scripted, ScriptedBackend};

    fn settings(primary: &str, fallbacks: &[&str]) -> DispatcherSettings {
        DispatcherSettings {
            primary_model: primary.to_string(),
            fallback_models: fallbacks.iter().map(|m| m.to_string()).collect(),
            mock_mode: false,
            debug_mode: false,
        }
    }

    fn dispatcher(
        backend: ScriptedBackend,
        settings: DispatcherSettings,
    ) -> (Arc<ScriptedBackend>, ModelDispatcher) {
        let backend = Arc::new(backend);
        let dispatcher = ModelDispatcher::new(backend.clone(), settings);
        (backend, dispatcher)
    }

    #[tokio::test]
    async fn test_primary_answers_first() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new().answer("a", "from a").answer("b", "from b"),
            settings("a", &["b"]),
        );
        assert_eq!(d.generate("hi").await, "from a");
        assert_eq!(backend.calls(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_failed_primary_cascades_in_priority_order() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new()
                .fail("a", BackendErrorKind::QuotaExhausted)
                .fail("b", BackendErrorKind::ModelNotFound)
                .fail("c", BackendErrorKind::QuotaExhausted)
                .answer("d", "from d"),
            settings("a", &["b", "c", "d"]),
        );
        assert_eq!(d.generate("hi").await, "from d");
        assert_eq!(backend.calls(), vec!["a", "b", "c", "d"]);
        assert_eq!(d.current_model(), "d");
    }

    #[tokio::test]
    async fn test_tries_every_model_once_before_giving_up() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new()
                .fail("a", BackendErrorKind::QuotaExhausted)
                .fail("b", BackendErrorKind::Other)
                .fail("c", BackendErrorKind::Other),
            settings("a", &["b", "c"]),
        );
        assert_eq!(d.generate("hi").await, UNAVAILABLE_MESSAGE);
        assert_eq!(backend.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicate_models_are_attempted_once_per_call() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new(),
            settings("a", &["b", "a", "b", "c"]),
        );
        d.generate("hi").await;
        assert_eq!(backend.calls(), vec!["a", "b", "c"]);
        assert_eq!(d.status_info().total_models, 3);
    }

    #[tokio::test]
    async fn test_failed_model_is_skipped_on_later_calls() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new()
                .fail("a", BackendErrorKind::QuotaExhausted)
                .answer("b", "from b"),
            settings("a", &["b"]),
        );
        d.generate("first").await;
        backend.clear_calls();

        // Even if the primary recovers upstream, it stays retired.
        backend.set("a", Scripted::Answer("a is back".into()));
        backend.set("b", Scripted::Fail(BackendErrorKind::Other));
        let answer = d.generate("second").await;

        assert_eq!(answer, UNAVAILABLE_MESSAGE);
        assert_eq!(backend.calls(), vec!["b"]);
        assert_eq!(d.status_info().failed_models, vec!["a"]);
    }

    #[tokio::test]
    async fn test_success_makes_model_sticky() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new()
                .fail("a", BackendErrorKind::Other)
                .answer("b", "from b")
                .answer("c", "from c"),
            settings("a", &["b", "c"]),
        );
        assert_eq!(d.generate("first").await, "from b");
        backend.clear_calls();

        assert_eq!(d.generate("second").await, "from b");
        assert_eq!(backend.calls(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_sticky_model_failure_falls_back_to_primary_order() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new()
                .fail("a", BackendErrorKind::Other)
                .answer("b", "from b")
                .answer("c", "from c"),
            settings("a", &["b", "c"]),
        );
        d.generate("first").await;
        backend.clear_calls();
        backend.set("b", Scripted::Fail(BackendErrorKind::QuotaExhausted));

        assert_eq!(d.generate("second").await, "from c");
        assert_eq!(backend.calls(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_transient_error_keeps_model_available() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new().fail("a", BackendErrorKind::Other),
            settings("a", &[]),
        );
        d.generate("first").await;
        d.generate("second").await;

        assert_eq!(backend.calls(), vec!["a", "a"]);
        assert!(d.status_info().failed_models.is_empty());
        assert_eq!(d.status_info().available_models, vec!["a"]);
    }

    #[tokio::test]
    async fn test_debug_mode_returns_last_error() {
        let mut s = settings("a", &[]);
        s.debug_mode = true;
        let (_, d) = dispatcher(
            ScriptedBackend::new().fail("a", BackendErrorKind::QuotaExhausted),
            s,
        );
        let answer = d.generate("hi").await;
        assert!(answer.starts_with("AI ERROR: All models failed."));
        assert!(answer.contains("Quota exhausted"));
    }

    #[tokio::test]
    async fn test_mock_mode_serves_validation_answer_after_exhaustion() {
        let mut s = settings("a", &["b"]);
        s.mock_mode = true;
        let (backend, d) = dispatcher(
            ScriptedBackend::new()
                .fail("a", BackendErrorKind::QuotaExhausted)
                .fail("b", BackendErrorKind::QuotaExhausted),
            s,
        );
        let answer = d
            .generate("Validate whether this document is a curriculum vitae. Skills: Rust")
            .await;

        assert_eq!(answer, mock::VALIDATION_YES);
        assert_eq!(backend.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_try_generate_reports_outage() {
        let (_, d) = dispatcher(
            ScriptedBackend::new().fail("a", BackendErrorKind::Other),
            settings("a", &[]),
        );
        let err = d.try_generate("Read this image").await.unwrap_err();
        assert_eq!(err, "a failed");
    }

    #[tokio::test]
    async fn test_try_generate_returns_answer() {
        let (_, d) = dispatcher(ScriptedBackend::new().answer("a", "text"), settings("a", &[]));
        assert_eq!(d.try_generate("Read this image").await.unwrap(), "text");
    }

    #[tokio::test]
    async fn test_try_generate_in_mock_mode_uses_canned_answer() {
        let mut s = settings("a", &[]);
        s.mock_mode = true;
        let (_, d) = dispatcher(ScriptedBackend::new(), s);
        assert_eq!(d.try_generate("Reply with OK").await.unwrap(), mock::DEFAULT);
    }

    #[tokio::test]
    async fn test_mock_mode_with_no_models_left_skips_backend() {
        let mut s = settings("a", &[]);
        s.mock_mode = true;
        let (backend, d) = dispatcher(
            ScriptedBackend::new().fail("a", BackendErrorKind::ModelNotFound),
            s,
        );
        d.generate("warm up").await;
        backend.clear_calls();

        let answer = d.generate("Give a match score for this candidate").await;
        assert_eq!(answer, mock::MATCHING);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_generate_json_parses_answer() {
        let (_, d) = dispatcher(
            ScriptedBackend::new().answer("a", "Sure!\n{\"name\": \"Jane\"}"),
            settings("a", &[]),
        );
        match d.generate_json("extract json").await {
            JsonAnswer::Parsed(v) => assert_eq!(v["name"], "Jane"),
            other => panic!("expected parsed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_json_outage_has_no_json() {
        let (_, d) = dispatcher(ScriptedBackend::new(), settings("a", &[]));
        let payload = d.generate_json("extract json").await.into_payload();
        assert_eq!(payload["raw_response"], UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_probe_reports_answering_model() {
        let (backend, d) = dispatcher(
            ScriptedBackend::new()
                .fail("a", BackendErrorKind::ModelNotFound)
                .answer("b", "OK"),
            settings("a", &["b"]),
        );
        let probe = d.probe().await;
        assert!(probe.reachable);
        assert_eq!(probe.model.as_deref(), Some("b"));
        assert_eq!(backend.prompts()[0], CONNECTIVITY_PROBE);
        assert_eq!(d.status_info().failed_models, vec!["a"]);
    }

    #[tokio::test]
    async fn test_probe_unreachable_even_in_mock_mode() {
        let mut s = settings("a", &[]);
        s.mock_mode = true;
        let (_, d) = dispatcher(ScriptedBackend::new(), s);
        let probe = d.probe().await;
        assert!(!probe.reachable);
        assert!(probe.last_error.is_some());
    }

    #[tokio::test]
    async fn test_status_info_lists_models_in_priority_order() {
        let (_, d) = dispatcher(
            ScriptedBackend::new()
                .fail("b", BackendErrorKind::QuotaExhausted)
                .fail("a", BackendErrorKind::Other)
                .answer("c", "ok"),
            settings("a", &["b", "c"]),
        );
        d.generate("hi").await;
        let status = d.status_info();
        assert_eq!(status.current_model, "c");
        assert_eq!(status.available_models, vec!["a", "c"]);
        assert_eq!(status.failed_models, vec!["b"]);
        assert_eq!(status.total_models, 3);
    }
}
