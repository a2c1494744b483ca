//! Conversation context assembly
//!
//! Materialises the author and chat rows on first contact and gathers what
//! the model needs to see: members, roles and the scope's current tasks.
//! Lookup failures are logged and degrade to empty collections.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::database::Store;
use crate::models::{
    Chat, CreateChatRequest, CreateUserRequest, MemberInfo, RoleInfo, Scope, Task, User,
};

/// Platform-side description of the message author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorDescriptor {
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

impl AuthorDescriptor {
    pub fn new(telegram_id: impl Into<String>) -> Self {
        Self { telegram_id: telegram_id.into(), ..Default::default() }
    }
}

/// Platform-side description of a group chat
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatDescriptor {
    pub telegram_id: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationContext {
    pub author: Option<User>,
    /// Present only for group conversations
    pub chat: Option<Chat>,
    pub roles: Vec<RoleInfo>,
    pub tasks: Vec<Task>,
    pub members: Vec<MemberInfo>,
}

impl ConversationContext {
    /// The scope reconciliation writes into, if identity rows could be resolved
    pub fn scope(&self) -> Option<Scope> {
        match (&self.chat, &self.author) {
            (Some(chat), _) => Some(Scope::Group { chat_id: chat.id }),
            (None, Some(author)) => Some(Scope::Personal { user_id: author.id }),
            (None, None) => None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.chat.is_some()
    }

    pub fn author_id(&self) -> Option<i64> {
        self.author.as_ref().map(|a| a.id)
    }
}

#[derive(Clone)]
pub struct ContextAssembler {
    store: Arc<dyn Store>,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Build the context for one message.
    ///
    /// `author` may be absent for group calls made through the HTTP API.
    pub async fn assemble(&self, author: Option<&AuthorDescriptor>, chat: Option<&ChatDescriptor>) -> ConversationContext {
        let author = match author {
            Some(descriptor) => self.resolve_author(descriptor).await,
            None => None,
        };

        let context = match chat {
            Some(descriptor) => self.assemble_group(author, descriptor).await,
            None => self.assemble_personal(author).await,
        };

        debug!(
            scope = ?context.scope(),
            tasks = context.tasks.len(),
            members = context.members.len(),
            roles = context.roles.len(),
            "Context assembled"
        );
        context
    }

    async fn resolve_author(&self, descriptor: &AuthorDescriptor) -> Option<User> {
        let request = CreateUserRequest {
            telegram_id: descriptor.telegram_id.clone(),
            username: descriptor.username.clone(),
            first_name: descriptor.first_name.clone(),
            last_name: descriptor.last_name.clone(),
            language_code: descriptor.language_code.clone(),
        };

        match self.store.upsert_user(request).await {
            Ok(user) => Some(user),
            Err(e) => {
                error!(telegram_id = %descriptor.telegram_id, error = %e, "Failed to materialise author");
                None
            }
        }
    }

    async fn assemble_personal(&self, author: Option<User>) -> ConversationContext {
        let Some(author) = author else {
            return ConversationContext::default();
        };

        let tasks = self.store.list_personal_tasks(author.id).await.unwrap_or_else(|e| {
            error!(user_id = author.id, error = %e, "Failed to load personal tasks");
            Vec::new()
        });

        let members = vec![MemberInfo { user: author.clone(), role_id: None, role_name: None }];

        ConversationContext { author: Some(author), chat: None, roles: Vec::new(), tasks, members }
    }

    async fn assemble_group(&self, author: Option<User>, descriptor: &ChatDescriptor) -> ConversationContext {
        let request = CreateChatRequest {
            telegram_id: descriptor.telegram_id.clone(),
            title: descriptor.title.clone(),
            username: descriptor.username.clone(),
        };

        let chat = match self.store.upsert_chat(request).await {
            Ok(chat) => chat,
            Err(e) => {
                error!(telegram_id = %descriptor.telegram_id, error = %e, "Failed to materialise chat");
                return ConversationContext { author, ..Default::default() };
            }
        };

        if let Some(author) = &author {
            if let Err(e) = self.store.ensure_membership(chat.id, author.id).await {
                error!(chat_id = chat.id, user_id = author.id, error = %e, "Failed to record membership");
            }
        }

        let members = self.store.list_members(chat.id).await.unwrap_or_else(|e| {
            error!(chat_id = chat.id, error = %e, "Failed to load members");
            Vec::new()
        });
        let roles = self.store.list_roles(chat.id).await.unwrap_or_else(|e| {
            error!(chat_id = chat.id, error = %e, "Failed to load roles");
            Vec::new()
        });
        let tasks = self.store.list_chat_tasks(chat.id).await.unwrap_or_else(|e| {
            error!(chat_id = chat.id, error = %e, "Failed to load chat tasks");
            Vec::new()
        });

        ConversationContext { author, chat: Some(chat), roles, tasks, members }
    }
}
