//! Database service layer
//!
//! Aggregates the repositories behind the `IdentityStore` and `TaskStore` seams

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::{ChatRepository, DatabasePool, IdentityStore, RoleRepository, TaskRepository, TaskStore, UserRepository};
use crate::models::*;
use crate::utils::Result;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub chats: ChatRepository,
    pub roles: RoleRepository,
    pub tasks: TaskRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            chats: ChatRepository::new(pool.clone()),
            roles: RoleRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool),
        }
    }
}

#[async_trait]
impl IdentityStore for DatabaseService {
    async fn upsert_user(&self, request: CreateUserRequest) -> Result<User> {
        self.users.upsert(request).await
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>> {
        self.users.find_by_telegram_id(telegram_id).await
    }

    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User> {
        self.users.update(id, request).await
    }

    async fn upsert_chat(&self, request: CreateChatRequest) -> Result<Chat> {
        self.chats.upsert(request).await
    }

    async fn find_chat(&self, id: i64) -> Result<Option<Chat>> {
        self.chats.find_by_id(id).await
    }

    async fn find_chat_by_telegram_id(&self, telegram_id: &str) -> Result<Option<Chat>> {
        self.chats.find_by_telegram_id(telegram_id).await
    }

    async fn update_chat(&self, id: i64, request: UpdateChatRequest) -> Result<Chat> {
        self.chats.update(id, request).await
    }

    async fn ensure_membership(&self, chat_id: i64, user_id: i64) -> Result<ChatMember> {
        self.chats.ensure_member(chat_id, user_id).await
    }

    async fn list_members(&self, chat_id: i64) -> Result<Vec<MemberInfo>> {
        self.chats.list_members(chat_id).await
    }

    async fn list_roles(&self, chat_id: i64) -> Result<Vec<RoleInfo>> {
        self.roles.list_for_chat(chat_id).await
    }

    async fn create_role(&self, chat_id: i64, name: &str) -> Result<Role> {
        self.roles.get_or_create(chat_id, name).await
    }

    async fn set_member_role(&self, chat_id: i64, user_id: i64, role_id: Option<i64>) -> Result<bool> {
        self.chats.set_member_role(chat_id, user_id, role_id).await
    }
}

#[async_trait]
impl TaskStore for DatabaseService {
    async fn create_task(&self, request: CreateTaskRequest) -> Result<Task> {
        self.tasks.create(request).await
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>> {
        self.tasks.find_by_id(id).await
    }

    async fn list_personal_tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        self.tasks.list_personal(user_id).await
    }

    async fn list_chat_tasks(&self, chat_id: i64) -> Result<Vec<Task>> {
        self.tasks.list_for_chat(chat_id).await
    }

    async fn update_task(&self, id: i64, request: UpdateTaskRequest) -> Result<Task> {
        self.tasks.update(id, request).await
    }

    async fn list_pending_with_deadline_after(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        self.tasks.list_pending_with_deadline_after(now).await
    }
}
