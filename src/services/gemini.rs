//! Gemini generateContent client
//!
//! Sends the prompt plus one content part (message text or inline audio) and
//! returns the model's raw text. Interpretation of that text happens in
//! `services::extraction`.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::models::MessagePayload;
use crate::utils::errors::{ExtractionError, ExtractionResult, Result, TaskMindError};

/// A model that turns a prompt and one content part into text
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, part: &MessagePayload) -> ExtractionResult<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
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
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("TaskMind-Bot/1.0")
            .build()
            .map_err(TaskMindError::Http)?;

        Ok(Self { config, http_client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request<'a>(prompt: &'a str, part: &'a MessagePayload) -> GenerateRequest<'a> {
        let content_part = match part {
            MessagePayload::Text(text) => RequestPart::Text { text },
            MessagePayload::Audio { bytes, mime_type } => RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(bytes),
                },
            },
        };

        GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart::Text { text: prompt }, content_part],
            }],
        }
    }

    async fn attempt(&self, body: &GenerateRequest<'_>) -> ExtractionResult<String> {
        let response = self.http_client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(ExtractionError::Api { status: status.as_u16(), message });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| ExtractionError::RequestFailed(format!("Invalid response body: {}", e)))?;

        let candidate = parsed.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or(ExtractionError::EmptyResponse)?;

        Ok(candidate.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
    }
}

fn map_transport_error(error: reqwest::Error) -> ExtractionError {
    if error.is_timeout() {
        ExtractionError::Timeout
    } else {
        ExtractionError::RequestFailed(error.to_string())
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str, part: &MessagePayload) -> ExtractionResult<String> {
        let body = Self::build_request(prompt, part);
        let mut retries_left = self.config.max_retries;

        loop {
            debug!(model = %self.config.model, payload = part.kind(), "Calling language model");
            match self.attempt(&body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && retries_left > 0 => {
                    retries_left -= 1;
                    warn!(error = %e, retries_left = retries_left, "Transient language model failure, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_request_shape() {
        let payload = MessagePayload::Text("Buy milk".to_string());
        let body = serde_json::to_value(GeminiClient::build_request("PROMPT", &payload)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({"contents": [{"parts": [{"text": "PROMPT"}, {"text": "Buy milk"}]}]})
        );
    }

    #[test]
    fn test_audio_request_is_inline_base64() {
        let payload = MessagePayload::Audio { bytes: b"abc".to_vec(), mime_type: "audio/ogg".to_string() };
        let body = serde_json::to_value(GeminiClient::build_request("PROMPT", &payload)).unwrap();

        let part = &body["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(part["mime_type"], "audio/ogg");
        assert_eq!(part["data"], "YWJj");
    }
}
