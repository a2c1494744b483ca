//! Role repository implementation

use std::collections::HashMap;
use sqlx::PgPool;
use chrono::Utc;
use crate::models::chat::{Role, RoleInfo};
use crate::utils::errors::TaskMindError;

#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get or create a role by name within a chat
    pub async fn get_or_create(&self, chat_id: i64, name: &str) -> Result<Role, TaskMindError> {
        let inserted = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (chat_id, name, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id, name) DO NOTHING
            RETURNING id, chat_id, name, created_at
            "#
        )
        .bind(chat_id)
        .bind(name)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(role) = inserted {
            return Ok(role);
        }

        let role = sqlx::query_as::<_, Role>(
            "SELECT id, chat_id, name, created_at FROM roles WHERE chat_id = $1 AND name = $2"
        )
        .bind(chat_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(role)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Role>, TaskMindError> {
        let role = sqlx::query_as::<_, Role>("SELECT id, chat_id, name, created_at FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    /// Roles of a chat with the IDs of the users holding each
    pub async fn list_for_chat(&self, chat_id: i64) -> Result<Vec<RoleInfo>, TaskMindError> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, chat_id, name, created_at FROM roles WHERE chat_id = $1 ORDER BY name"
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        let holders: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT role_id, user_id FROM chat_members WHERE chat_id = $1 AND role_id IS NOT NULL ORDER BY user_id"
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        let mut members_by_role: HashMap<i64, Vec<i64>> = HashMap::new();
        for (role_id, user_id) in holders {
            members_by_role.entry(role_id).or_default().push(user_id);
        }

        Ok(roles
            .into_iter()
            .map(|role| {
                let member_ids = members_by_role.remove(&role.id).unwrap_or_default();
                RoleInfo { role, member_ids }
            })
            .collect())
    }
}
