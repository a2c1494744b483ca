//! Chat, membership and role models

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::user::User;

/// Title used when a group arrives without one
pub const UNKNOWN_GROUP_TITLE: &str = "Unknown Group";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub id: i64,
    pub telegram_id: String,
    pub title: String,
    pub username: Option<String>,
    pub welcome_message_id: Option<i32>,
    pub warning_message_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChatMember {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub role_id: Option<i64>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub chat_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A chat member joined with their user row and role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub user: User,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
}

/// A role with the user IDs currently holding it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub role: Role,
    pub member_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChatRequest {
    pub telegram_id: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

impl CreateChatRequest {
    /// Title to persist, falling back when the platform sent none
    pub fn effective_title(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_GROUP_TITLE)
            .to_string()
    }
}

/// Partial chat update; the pinned-message slots accept explicit clearing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChatRequest {
    pub title: Option<String>,
    pub username: Option<String>,
    pub welcome_message_id: Option<Option<i32>>,
    pub warning_message_id: Option<Option<i32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_title_fallback() {
        let request = CreateChatRequest { telegram_id: "-100".into(), title: None, username: None };
        assert_eq!(request.effective_title(), UNKNOWN_GROUP_TITLE);

        let request = CreateChatRequest { telegram_id: "-100".into(), title: Some("  ".into()), username: None };
        assert_eq!(request.effective_title(), UNKNOWN_GROUP_TITLE);

        let request = CreateChatRequest { telegram_id: "-100".into(), title: Some("Core Team".into()), username: None };
        assert_eq!(request.effective_title(), "Core Team");
    }
}
