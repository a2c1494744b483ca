//! Extraction client: model call plus response interpretation
//!
//! The model's reply is untrusted text. It becomes `Structured` only when it is
//! a JSON object carrying at least one known top-level key; anything else is
//! handed back as `Freeform` for the caller to show verbatim.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{ExtractionOutcome, ExtractionResult, MessagePayload};
use crate::services::gemini::LanguageModel;
use crate::utils::errors::ExtractionResult as ModelResult;
use crate::utils::logging::log_api_error;

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

/// Remove a markdown code fence if the reply contains one
pub fn strip_code_fences(raw: &str) -> &str {
    match fence_pattern().and_then(|re| re.captures(raw)).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim(),
    }
}

/// Decide once whether the reply is structured operations or free text
pub fn parse_model_response(raw: &str) -> ExtractionOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ExtractionOutcome::Freeform(String::new());
    }

    let body = strip_code_fences(trimmed);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return ExtractionOutcome::Freeform(trimmed.to_string()),
    };

    let is_result_shape = value
        .as_object()
        .map(|obj| ExtractionResult::KNOWN_KEYS.iter().any(|key| obj.contains_key(*key)))
        .unwrap_or(false);
    if !is_result_shape {
        return ExtractionOutcome::Freeform(trimmed.to_string());
    }

    match serde_json::from_value::<ExtractionResult>(value) {
        Ok(result) => ExtractionOutcome::Structured(result),
        Err(e) => {
            warn!(error = %e, "Model JSON did not match the extraction shape");
            ExtractionOutcome::Freeform(trimmed.to_string())
        }
    }
}

#[derive(Clone)]
pub struct ExtractionClient {
    model: Arc<dyn LanguageModel>,
}

impl ExtractionClient {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Call the model and interpret its reply; API failures are logged and returned
    pub async fn extract(&self, prompt: &str, payload: &MessagePayload) -> ModelResult<ExtractionOutcome> {
        match self.model.generate(prompt, payload).await {
            Ok(raw) => {
                let outcome = parse_model_response(&raw);
                debug!(
                    structured = matches!(outcome, ExtractionOutcome::Structured(_)),
                    payload = payload.kind(),
                    "Model reply interpreted"
                );
                Ok(outcome)
            }
            Err(e) => {
                log_api_error("gemini", &e.to_string(), Some(payload.kind()));
                Err(e)
            }
        }
    }
}
