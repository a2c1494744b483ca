//! API request handlers

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::handlers::messages::DEFAULT_VOICE_MIME;
use crate::models::{MessagePayload, TaskType};
use crate::services::{AuthorDescriptor, ChatDescriptor, InboundMessage, PipelineOutcome, ReconciliationResult};

/// Health check
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fields of the `/gemini/extract` multipart form
#[derive(Debug, Default)]
pub struct ExtractForm {
    pub text: Option<String>,
    pub audio: Option<(Vec<u8>, String)>,
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub chat_id: Option<String>,
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

async fn read_extract_form(mut multipart: Multipart) -> ApiResult<ExtractForm> {
    let mut form = ExtractForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => form.text = non_empty(field.text().await?),
            "audioFile" => {
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| DEFAULT_VOICE_MIME.to_string());
                let bytes = field.bytes().await?.to_vec();
                if !bytes.is_empty() {
                    form.audio = Some((bytes, mime_type));
                }
            }
            "type" => form.kind = non_empty(field.text().await?),
            "userId" => form.user_id = non_empty(field.text().await?),
            "chatId" => form.chat_id = non_empty(field.text().await?),
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

impl ExtractForm {
    /// Validate the form and turn it into a pipeline input.
    ///
    /// Without an explicit `type`, a present `chatId` means group.
    pub fn into_inbound(self) -> ApiResult<InboundMessage> {
        let kind = match self.kind.as_deref() {
            Some(raw) => raw.parse::<TaskType>().map_err(ApiError::BadRequest)?,
            None if self.chat_id.is_some() => TaskType::Group,
            None => TaskType::Personal,
        };

        let author = self.user_id.map(AuthorDescriptor::new);
        let chat = match kind {
            TaskType::Personal => {
                if author.is_none() {
                    return Err(ApiError::BadRequest("userId is required for personal requests".to_string()));
                }
                None
            }
            TaskType::Group => {
                let telegram_id = self.chat_id.ok_or_else(|| {
                    ApiError::BadRequest("chatId is required for group requests".to_string())
                })?;
                Some(ChatDescriptor { telegram_id, title: None, username: None })
            }
        };

        let payload = match (self.audio, self.text) {
            (Some((bytes, mime_type)), _) => MessagePayload::Audio { bytes, mime_type },
            (None, Some(text)) => MessagePayload::Text(text),
            (None, None) => return Err(ApiError::BadRequest("text or audioFile is required".to_string())),
        };

        Ok(InboundMessage { author, chat, payload })
    }
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    #[serde(flatten)]
    pub result: ReconciliationResult,
    /// The rendered reply a chat user would have received
    pub message: String,
}

/// Run one message through the pipeline
pub async fn extract(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<Value>> {
    let inbound = read_extract_form(multipart).await?.into_inbound()?;
    info!(kind = inbound.payload.kind(), group = inbound.chat.is_some(), "Extraction requested over HTTP");

    let reply = state.services.pipeline.process(inbound).await;

    let body = match reply.outcome {
        PipelineOutcome::Reconciled(result) => {
            serde_json::to_value(ExtractResponse { result, message: reply.text })
                .map_err(|e| ApiError::Internal(e.to_string()))?
        }
        PipelineOutcome::Freeform(text) => json!({ "freeform": text }),
        PipelineOutcome::Failed => return Err(ApiError::Upstream(reply.text)),
    };

    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub user_id: Option<String>,
    pub chat_id: Option<String>,
}

/// List tasks for a personal or group scope; `chatId` wins when both are given
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Value>> {
    let store = &state.services.store;

    let tasks = match (query.chat_id, query.user_id) {
        (Some(chat_id), _) => {
            let chat = store
                .find_chat_by_telegram_id(&chat_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("chat {}", chat_id)))?;
            store.list_chat_tasks(chat.id).await?
        }
        (None, Some(user_id)) => {
            let user = store
                .find_user_by_telegram_id(&user_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("user {}", user_id)))?;
            store.list_personal_tasks(user.id).await?
        }
        (None, None) => return Err(ApiError::BadRequest("userId or chatId is required".to_string())),
    };

    Ok(Json(json!({
        "total": tasks.len(),
        "tasks": tasks,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn form() -> ExtractForm {
        ExtractForm { text: Some("Buy milk".to_string()), ..Default::default() }
    }

    #[test]
    fn test_personal_form_requires_user() {
        assert_matches!(form().into_inbound(), Err(ApiError::BadRequest(_)));

        let inbound = ExtractForm { user_id: Some("42".into()), ..form() }.into_inbound().unwrap();
        assert_eq!(inbound.author.unwrap().telegram_id, "42");
        assert!(inbound.chat.is_none());
        assert_eq!(inbound.payload, MessagePayload::Text("Buy milk".into()));
    }

    #[test]
    fn test_chat_id_implies_group() {
        let inbound = ExtractForm { chat_id: Some("-100".into()), ..form() }.into_inbound().unwrap();
        assert_eq!(inbound.chat.unwrap().telegram_id, "-100");
        assert!(inbound.author.is_none());

        let explicit = ExtractForm { kind: Some("group".into()), user_id: Some("1".into()), ..form() };
        assert_matches!(explicit.into_inbound(), Err(ApiError::BadRequest(_)));
    }

    #[test]
    fn test_audio_takes_precedence_and_payload_required() {
        let inbound = ExtractForm {
            user_id: Some("1".into()),
            audio: Some((vec![1, 2, 3], "audio/ogg".into())),
            ..form()
        }
        .into_inbound()
        .unwrap();
        assert_eq!(inbound.payload.kind(), "audio");

        let empty = ExtractForm { user_id: Some("1".into()), ..Default::default() };
        assert_matches!(empty.into_inbound(), Err(ApiError::BadRequest(_)));

        let bad_type = ExtractForm { kind: Some("team".into()), ..form() };
        assert_matches!(bad_type.into_inbound(), Err(ApiError::BadRequest(_)));
    }
}
