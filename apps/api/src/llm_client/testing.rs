//! Scripted `ModelBackend` for unit and router tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BackendError, BackendErrorKind, ModelBackend, Prompt};

#[derive(Debug, Clone)]
pub enum Scripted {
    Answer(String),
    Fail(BackendErrorKind),
}

/// Answers per model id; unscripted models fail with `Other`. Every attempt is
/// recorded in call order.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, model: &str, text: &str) -> Self {
        self.set(model, Scripted::Answer(text.to_string()));
        self
    }

    pub fn fail(self, model: &str, kind: BackendErrorKind) -> Self {
        self.set(model, Scripted::Fail(kind));
        self
    }

    pub fn set(&self, model: &str, outcome: Scripted) {
        self.script.lock().insert(model.to_string(), outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, BackendError> {
        self.calls.lock().push(model.to_string());
        self.prompts.lock().push(prompt.text.clone());
        let outcome = self.script.lock().get(model).cloned();
        match outcome {
            Some(Scripted::Answer(text)) => Ok(text),
            Some(Scripted::Fail(kind)) => Err(BackendError::new(kind, format!("{model} failed"))),
            None => Err(BackendError::other(format!("{model} is not scripted"))),
        }
    }
}
