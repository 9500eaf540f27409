//! Locating and parsing the JSON object inside a free-text model answer.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Outcome of the JSON entry point. Never an `Err`: malformed output is data.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonAnswer {
    /// The span between the first `{` and the last `}` parsed as JSON.
    Parsed(Value),
    /// The answer contained no `{ … }` span at all.
    NoJson { raw_response: String },
    /// A span was found but failed strict parsing.
    Invalid { error: String, raw_response: String },
}

impl JsonAnswer {
    pub fn from_answer(answer: &str) -> Self {
        let Some(span) = object_span(answer) else {
            return JsonAnswer::NoJson {
                raw_response: answer.to_string(),
            };
        };

        match serde_json::from_str::<Value>(span) {
            Ok(value) => JsonAnswer::Parsed(value),
            Err(e) => {
                tracing::debug!("JSON parse error in model answer: {e}");
                JsonAnswer::Invalid {
                    error: "Invalid JSON response".to_string(),
                    raw_response: answer.to_string(),
                }
            }
        }
    }

    /// Deserializes a parsed object into `T`. Returns the structured error payload
    /// (error + raw text) for every other outcome, including a shape mismatch.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, Value> {
        match self {
            JsonAnswer::Parsed(value) => {
                let raw = value.to_string();
                serde_json::from_value(value).map_err(|e| {
                    json!({
                        "error": format!("Unexpected JSON shape: {e}"),
                        "raw_response": raw,
                    })
                })
            }
            other => Err(other.into_payload()),
        }
    }

    /// The loose JSON payload handed back to callers.
    pub fn into_payload(self) -> Value {
        match self {
            JsonAnswer::Parsed(value) => value,
            JsonAnswer::NoJson { raw_response } => json!({ "raw_response": raw_response }),
            JsonAnswer::Invalid {
                error,
                raw_response,
            } => json!({ "error": error, "raw_response": raw_response }),
        }
    }
}

/// Slice from the first `{` through the last `}`, if they appear in that order.
fn object_span(text: &str) -> Option<&str> {
    let text = strip_json_fences(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}
