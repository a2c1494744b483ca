//! Chat and membership repository implementation

use sqlx::{FromRow, PgPool};
use chrono::{DateTime, Utc};
use crate::models::chat::{Chat, ChatMember, CreateChatRequest, MemberInfo, UpdateChatRequest};
use crate::models::user::{NotificationPreset, User};
use crate::utils::errors::TaskMindError;

const CHAT_COLUMNS: &str = "id, telegram_id, title, username, welcome_message_id, warning_message_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

/// Flat row of `chat_members` joined with `users` and `roles`
#[derive(FromRow)]
struct MemberRow {
    id: i64,
    telegram_id: String,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    language_code: String,
    personal_preset: NotificationPreset,
    group_preset: NotificationPreset,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    role_id: Option<i64>,
    role_name: Option<String>,
}

impl From<MemberRow> for MemberInfo {
    fn from(row: MemberRow) -> Self {
        MemberInfo {
            user: User {
                id: row.id,
                telegram_id: row.telegram_id,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                language_code: row.language_code,
                personal_preset: row.personal_preset,
                group_preset: row.group_preset,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            role_id: row.role_id,
            role_name: row.role_name,
        }
    }
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get or create a chat by Telegram ID; an existing row is returned unmodified
    pub async fn upsert(&self, request: CreateChatRequest) -> Result<Chat, TaskMindError> {
        let inserted = sqlx::query_as::<_, Chat>(&format!(
            r#"
            INSERT INTO chats (telegram_id, title, username, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (telegram_id) DO NOTHING
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(&request.telegram_id)
        .bind(request.effective_title())
        .bind(&request.username)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(chat) = inserted {
            return Ok(chat);
        }

        self.find_by_telegram_id(&request.telegram_id).await?
            .ok_or_else(|| TaskMindError::ChatNotFound { chat_id: request.telegram_id.clone() })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, TaskMindError> {
        let chat = sqlx::query_as::<_, Chat>(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(chat)
    }

    pub async fn find_by_telegram_id(&self, telegram_id: &str) -> Result<Option<Chat>, TaskMindError> {
        let chat = sqlx::query_as::<_, Chat>(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE telegram_id = $1"))
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(chat)
    }

    /// Update chat; pinned-message slots are only touched when supplied
    pub async fn update(&self, id: i64, request: UpdateChatRequest) -> Result<Chat, TaskMindError> {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            r#"
            UPDATE chats
            SET title = COALESCE($2, title),
                username = COALESCE($3, username),
                welcome_message_id = CASE WHEN $4 THEN $5 ELSE welcome_message_id END,
                warning_message_id = CASE WHEN $6 THEN $7 ELSE warning_message_id END,
                updated_at = $8
            WHERE id = $1
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title)
        .bind(request.username)
        .bind(request.welcome_message_id.is_some())
        .bind(request.welcome_message_id.flatten())
        .bind(request.warning_message_id.is_some())
        .bind(request.warning_message_id.flatten())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        chat.ok_or_else(|| TaskMindError::ChatNotFound { chat_id: id.to_string() })
    }

    /// Ensure a membership row exists for (chat, user)
    pub async fn ensure_member(&self, chat_id: i64, user_id: i64) -> Result<ChatMember, TaskMindError> {
        let inserted = sqlx::query_as::<_, ChatMember>(
            r#"
            INSERT INTO chat_members (chat_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id, user_id) DO NOTHING
            RETURNING id, chat_id, user_id, role_id, joined_at
            "#
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(member) = inserted {
            return Ok(member);
        }

        let member = sqlx::query_as::<_, ChatMember>(
            "SELECT id, chat_id, user_id, role_id, joined_at FROM chat_members WHERE chat_id = $1 AND user_id = $2"
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    /// All members of a chat with their user rows and role names
    pub async fn list_members(&self, chat_id: i64) -> Result<Vec<MemberInfo>, TaskMindError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT u.id, u.telegram_id, u.username, u.first_name, u.last_name, u.language_code,
                   u.personal_preset, u.group_preset, u.created_at, u.updated_at,
                   cm.role_id, r.name AS role_name
            FROM chat_members cm
            JOIN users u ON u.id = cm.user_id
            LEFT JOIN roles r ON r.id = cm.role_id
            WHERE cm.chat_id = $1
            ORDER BY cm.joined_at, u.id
            "#
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MemberInfo::from).collect())
    }

    /// Set or clear a member's role; returns false when the user is not a member
    pub async fn set_member_role(&self, chat_id: i64, user_id: i64, role_id: Option<i64>) -> Result<bool, TaskMindError> {
        let result = sqlx::query("UPDATE chat_members SET role_id = $3 WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
