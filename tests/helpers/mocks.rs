//! Recording messenger and scripted language model

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use taskmind::models::MessagePayload;
use taskmind::services::{LanguageModel, Messenger};
use taskmind::utils::errors::{ExtractionError, ExtractionResult};
use taskmind::{Result, TaskMindError};

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat: String,
    pub text: String,
}

/// Captures every outbound message instead of talking to Telegram
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_sends: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn add_file(&self, file_id: &str, bytes: &[u8]) {
        self.files.lock().unwrap().insert(file_id.to_string(), bytes.to_vec());
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat: &str, html: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TaskMindError::ServiceUnavailable("send disabled".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage { chat: chat.to_string(), text: html.to_string() });
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| TaskMindError::InvalidInput(format!("unknown file {}", file_id)))
    }
}

/// A language model that replays queued replies and records what it was asked
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ExtractionResult<String>>>,
    calls: Mutex<Vec<(String, MessagePayload)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn fail(&self, error: ExtractionError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<(String, MessagePayload)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(prompt, _)| prompt.clone())
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, part: &MessagePayload) -> ExtractionResult<String> {
        self.calls.lock().unwrap().push((prompt.to_string(), part.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ExtractionError::EmptyResponse))
    }
}
