//! In-memory `Store` with the same uniqueness rules as the Postgres schema

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use taskmind::database::{IdentityStore, TaskStore};
use taskmind::models::{
    format_readable_id, Chat, ChatMember, CreateChatRequest, CreateTaskRequest, CreateUserRequest,
    MemberInfo, NotificationPreset, Role, RoleInfo, Task, TaskType, UpdateChatRequest,
    UpdateTaskRequest, UpdateUserRequest, User,
};
use taskmind::{Result, TaskMindError};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    chats: Vec<Chat>,
    members: Vec<ChatMember>,
    roles: Vec<Role>,
    tasks: Vec<Task>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn chat_count(&self) -> usize {
        self.tables.lock().unwrap().chats.len()
    }

    pub fn member_count(&self) -> usize {
        self.tables.lock().unwrap().members.len()
    }

    pub fn user_by_telegram_id(&self, telegram_id: &str) -> Option<User> {
        self.tables.lock().unwrap().users.iter().find(|u| u.telegram_id == telegram_id).cloned()
    }

    pub fn chat_by_telegram_id(&self, telegram_id: &str) -> Option<Chat> {
        self.tables.lock().unwrap().chats.iter().find(|c| c.telegram_id == telegram_id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tables.lock().unwrap().tasks.clone()
    }

    /// Insert a task row directly, bypassing readable ID generation
    pub fn insert_task(&self, task: Task) -> Task {
        let mut tables = self.tables.lock().unwrap();
        tables.next_id = tables.next_id.max(task.id);
        tables.tasks.push(task.clone());
        task
    }

    fn sorted(mut tasks: Vec<Task>) -> Vec<Task> {
        tasks.sort_by(|a, b| {
            a.is_completed
                .cmp(&b.is_completed)
                .then_with(|| match (a.deadline, b.deadline) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        tasks
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn upsert_user(&self, request: CreateUserRequest) -> Result<User> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter().find(|u| u.telegram_id == request.telegram_id) {
            return Ok(user.clone());
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            telegram_id: request.telegram_id,
            username: request.username,
            first_name: request.first_name,
            last_name: request.last_name,
            language_code: request.language_code.unwrap_or_else(|| "en".to_string()),
            personal_preset: NotificationPreset::Standard,
            group_preset: NotificationPreset::Standard,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.lock().unwrap().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>> {
        Ok(self.tables.lock().unwrap().users.iter().find(|u| u.telegram_id == telegram_id).cloned())
    }

    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User> {
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(TaskMindError::UserNotFound { user_id: id.to_string() })?;

        if let Some(username) = request.username {
            user.username = Some(username);
        }
        if let Some(first_name) = request.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = request.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(language_code) = request.language_code {
            user.language_code = language_code;
        }
        if let Some(preset) = request.personal_preset {
            user.personal_preset = preset;
        }
        if let Some(preset) = request.group_preset {
            user.group_preset = preset;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn upsert_chat(&self, request: CreateChatRequest) -> Result<Chat> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(chat) = tables.chats.iter().find(|c| c.telegram_id == request.telegram_id) {
            return Ok(chat.clone());
        }

        let now = Utc::now();
        let chat = Chat {
            id: tables.next_id(),
            title: request.effective_title(),
            telegram_id: request.telegram_id,
            username: request.username,
            welcome_message_id: None,
            warning_message_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.chats.push(chat.clone());
        Ok(chat)
    }

    async fn find_chat(&self, id: i64) -> Result<Option<Chat>> {
        Ok(self.tables.lock().unwrap().chats.iter().find(|c| c.id == id).cloned())
    }

    async fn find_chat_by_telegram_id(&self, telegram_id: &str) -> Result<Option<Chat>> {
        Ok(self.tables.lock().unwrap().chats.iter().find(|c| c.telegram_id == telegram_id).cloned())
    }

    async fn update_chat(&self, id: i64, request: UpdateChatRequest) -> Result<Chat> {
        let mut tables = self.tables.lock().unwrap();
        let chat = tables
            .chats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(TaskMindError::ChatNotFound { chat_id: id.to_string() })?;

        if let Some(title) = request.title {
            chat.title = title;
        }
        if let Some(username) = request.username {
            chat.username = Some(username);
        }
        if let Some(welcome) = request.welcome_message_id {
            chat.welcome_message_id = welcome;
        }
        if let Some(warning) = request.warning_message_id {
            chat.warning_message_id = warning;
        }
        chat.updated_at = Utc::now();
        Ok(chat.clone())
    }

    async fn ensure_membership(&self, chat_id: i64, user_id: i64) -> Result<ChatMember> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(member) = tables.members.iter().find(|m| m.chat_id == chat_id && m.user_id == user_id) {
            return Ok(member.clone());
        }

        let member = ChatMember {
            id: tables.next_id(),
            chat_id,
            user_id,
            role_id: None,
            joined_at: Utc::now(),
        };
        tables.members.push(member.clone());
        Ok(member)
    }

    async fn list_members(&self, chat_id: i64) -> Result<Vec<MemberInfo>> {
        let tables = self.tables.lock().unwrap();
        let members = tables
            .members
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .filter_map(|m| {
                let user = tables.users.iter().find(|u| u.id == m.user_id)?.clone();
                let role_name = m
                    .role_id
                    .and_then(|id| tables.roles.iter().find(|r| r.id == id))
                    .map(|r| r.name.clone());
                Some(MemberInfo { user, role_id: m.role_id, role_name })
            })
            .collect();
        Ok(members)
    }

    async fn list_roles(&self, chat_id: i64) -> Result<Vec<RoleInfo>> {
        let tables = self.tables.lock().unwrap();
        let mut roles: Vec<RoleInfo> = tables
            .roles
            .iter()
            .filter(|r| r.chat_id == chat_id)
            .map(|role| RoleInfo {
                role: role.clone(),
                member_ids: tables
                    .members
                    .iter()
                    .filter(|m| m.chat_id == chat_id && m.role_id == Some(role.id))
                    .map(|m| m.user_id)
                    .collect(),
            })
            .collect();
        roles.sort_by(|a, b| a.role.name.cmp(&b.role.name));
        Ok(roles)
    }

    async fn create_role(&self, chat_id: i64, name: &str) -> Result<Role> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(role) = tables.roles.iter().find(|r| r.chat_id == chat_id && r.name == name) {
            return Ok(role.clone());
        }

        let role = Role {
            id: tables.next_id(),
            chat_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.roles.push(role.clone());
        Ok(role)
    }

    async fn set_member_role(&self, chat_id: i64, user_id: i64, role_id: Option<i64>) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables.members.iter_mut().find(|m| m.chat_id == chat_id && m.user_id == user_id) {
            Some(member) => {
                member.role_id = role_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, request: CreateTaskRequest) -> Result<Task> {
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let id = tables.next_id();
        let task = Task {
            id,
            readable_id: Some(format_readable_id(&request.readable_prefix, id)),
            title: request.title,
            description: request.description,
            priority: request.priority,
            deadline: request.deadline,
            is_completed: false,
            task_type: request.task_type,
            author_id: request.author_id,
            chat_id: request.chat_id,
            assigned_user_id: request.assigned_user_id,
            assigned_role_id: request.assigned_role_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>> {
        Ok(self.tables.lock().unwrap().tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn list_personal_tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        let tasks = self.tables.lock().unwrap().tasks.clone();
        Ok(Self::sorted(
            tasks
                .into_iter()
                .filter(|t| t.task_type == TaskType::Personal && t.author_id == Some(user_id))
                .collect(),
        ))
    }

    async fn list_chat_tasks(&self, chat_id: i64) -> Result<Vec<Task>> {
        let tasks = self.tables.lock().unwrap().tasks.clone();
        Ok(Self::sorted(
            tasks
                .into_iter()
                .filter(|t| t.task_type == TaskType::Group && t.chat_id == Some(chat_id))
                .collect(),
        ))
    }

    async fn update_task(&self, id: i64, request: UpdateTaskRequest) -> Result<Task> {
        let mut tables = self.tables.lock().unwrap();
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskMindError::TaskNotFound { task_id: id })?;
        request.apply_to(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn list_pending_with_deadline_after(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let tables = self.tables.lock().unwrap();
        let mut tasks: Vec<Task> = tables
            .tasks
            .iter()
            .filter(|t| !t.is_completed && t.deadline.is_some_and(|d| d > now))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.deadline);
        Ok(tasks)
    }
}
