//! Storage seams consumed by the core services
//!
//! The pipeline, reconciliation engine and scheduler only see these traits, so
//! they can be driven against Postgres in production and in memory in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Chat, ChatMember, CreateChatRequest, CreateTaskRequest, CreateUserRequest, MemberInfo, Role,
    RoleInfo, Task, UpdateChatRequest, UpdateTaskRequest, UpdateUserRequest, User,
};
use crate::utils::Result;

/// Users, chats, memberships and roles
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Idempotent get-or-create keyed on the platform user ID
    async fn upsert_user(&self, request: CreateUserRequest) -> Result<User>;
    async fn find_user(&self, id: i64) -> Result<Option<User>>;
    async fn find_user_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>>;
    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User>;

    /// Idempotent get-or-create keyed on the platform chat ID
    async fn upsert_chat(&self, request: CreateChatRequest) -> Result<Chat>;
    async fn find_chat(&self, id: i64) -> Result<Option<Chat>>;
    async fn find_chat_by_telegram_id(&self, telegram_id: &str) -> Result<Option<Chat>>;
    async fn update_chat(&self, id: i64, request: UpdateChatRequest) -> Result<Chat>;

    async fn ensure_membership(&self, chat_id: i64, user_id: i64) -> Result<ChatMember>;
    async fn list_members(&self, chat_id: i64) -> Result<Vec<MemberInfo>>;
    async fn list_roles(&self, chat_id: i64) -> Result<Vec<RoleInfo>>;
    /// Get-or-create by name within a chat
    async fn create_role(&self, chat_id: i64, name: &str) -> Result<Role>;
    /// Returns false when the user is not a member of the chat
    async fn set_member_role(&self, chat_id: i64, user_id: i64, role_id: Option<i64>) -> Result<bool>;
}

/// Task rows
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, request: CreateTaskRequest) -> Result<Task>;
    async fn find_task(&self, id: i64) -> Result<Option<Task>>;
    async fn list_personal_tasks(&self, user_id: i64) -> Result<Vec<Task>>;
    async fn list_chat_tasks(&self, chat_id: i64) -> Result<Vec<Task>>;
    /// Fails with `TaskNotFound` when the row is missing
    async fn update_task(&self, id: i64, request: UpdateTaskRequest) -> Result<Task>;
    async fn list_pending_with_deadline_after(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;
}

/// Everything the services need from persistence
pub trait Store: IdentityStore + TaskStore {}

impl<T: IdentityStore + TaskStore> Store for T {}
