//! Test context wiring the real services to in-memory collaborators

use std::sync::Arc;

use chrono::{DateTime, Utc};

use taskmind::config::Settings;
use taskmind::database::Store;
use taskmind::i18n::I18n;
use taskmind::models::{CreateChatRequest, CreateUserRequest, Priority, Task, TaskType, User, Chat};
use taskmind::services::{AuthorDescriptor, ChatDescriptor, InboundMessage, ServiceFactory};
use taskmind::models::MessagePayload;

use super::memory_store::MemoryStore;
use super::mocks::{RecordingMessenger, ScriptedModel};

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub model: Arc<ScriptedModel>,
    pub services: ServiceFactory,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let model = Arc::new(ScriptedModel::new());

        let services = ServiceFactory::new(
            &settings,
            store.clone() as Arc<dyn Store>,
            model.clone(),
            messenger.clone(),
            I18n::embedded(),
        );

        Self { store, messenger, model, services }
    }

    pub async fn user(&self, telegram_id: &str, first_name: &str) -> User {
        use taskmind::database::IdentityStore;
        self.store
            .upsert_user(CreateUserRequest {
                telegram_id: telegram_id.to_string(),
                username: Some(first_name.to_lowercase()),
                first_name: Some(first_name.to_string()),
                last_name: None,
                language_code: Some("en".to_string()),
            })
            .await
            .unwrap()
    }

    pub async fn group(&self, telegram_id: &str, title: &str) -> Chat {
        use taskmind::database::IdentityStore;
        self.store
            .upsert_chat(CreateChatRequest {
                telegram_id: telegram_id.to_string(),
                title: Some(title.to_string()),
                username: None,
            })
            .await
            .unwrap()
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.bot.token = "123456:TEST".to_string();
    settings.bot.utc_offset_minutes = 0;
    settings.scheduler.tick_seconds = 60;
    settings
}

pub fn author(telegram_id: &str, first_name: &str) -> AuthorDescriptor {
    AuthorDescriptor {
        first_name: Some(first_name.to_string()),
        username: Some(first_name.to_lowercase()),
        language_code: Some("en".to_string()),
        ..AuthorDescriptor::new(telegram_id)
    }
}

pub fn group_chat(telegram_id: &str, title: &str) -> ChatDescriptor {
    ChatDescriptor {
        telegram_id: telegram_id.to_string(),
        title: Some(title.to_string()),
        username: None,
    }
}

pub fn personal_text(telegram_id: &str, first_name: &str, text: &str) -> InboundMessage {
    InboundMessage {
        author: Some(author(telegram_id, first_name)),
        chat: None,
        payload: MessagePayload::Text(text.to_string()),
    }
}

pub fn group_text(telegram_id: &str, first_name: &str, chat: ChatDescriptor, text: &str) -> InboundMessage {
    InboundMessage {
        author: Some(author(telegram_id, first_name)),
        chat: Some(chat),
        payload: MessagePayload::Text(text.to_string()),
    }
}

/// A task row as the database would hold it
pub fn task_row(id: i64, title: &str, task_type: TaskType, owner: i64, now: DateTime<Utc>) -> Task {
    let (author_id, chat_id) = match task_type {
        TaskType::Personal => (Some(owner), None),
        TaskType::Group => (None, Some(owner)),
    };
    Task {
        id,
        readable_id: Some(format!("TST-{}", id)),
        title: title.to_string(),
        description: None,
        priority: Priority::Medium,
        deadline: None,
        is_completed: false,
        task_type,
        author_id,
        chat_id,
        assigned_user_id: None,
        assigned_role_id: None,
        created_at: now,
        updated_at: now,
    }
}
