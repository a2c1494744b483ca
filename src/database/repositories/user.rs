//! User repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::user::{User, CreateUserRequest, UpdateUserRequest};
use crate::utils::errors::TaskMindError;

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, language_code, personal_preset, group_preset, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get or create a user by Telegram ID.
    ///
    /// Relies on the unique constraint on `telegram_id`, so two concurrent first
    /// contacts resolve to the same row.
    pub async fn upsert(&self, request: CreateUserRequest) -> Result<User, TaskMindError> {
        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name, language_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (telegram_id) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&request.telegram_id)
        .bind(&request.username)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.language_code.clone().unwrap_or_else(|| "en".to_string()))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(user) = inserted {
            return Ok(user);
        }

        self.find_by_telegram_id(&request.telegram_id).await?
            .ok_or_else(|| TaskMindError::UserNotFound { user_id: request.telegram_id.clone() })
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, TaskMindError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by Telegram ID
    pub async fn find_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>, TaskMindError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1"))
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Update user
    pub async fn update(&self, id: i64, request: UpdateUserRequest) -> Result<User, TaskMindError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                language_code = COALESCE($5, language_code),
                personal_preset = COALESCE($6, personal_preset),
                group_preset = COALESCE($7, group_preset),
                updated_at = $8
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.username)
        .bind(request.first_name)
        .bind(request.last_name)
        .bind(request.language_code)
        .bind(request.personal_preset)
        .bind(request.group_preset)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| TaskMindError::UserNotFound { user_id: id.to_string() })
    }
}
