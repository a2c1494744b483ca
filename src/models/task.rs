//! Task model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Prefix used for readable IDs of personal tasks
pub const PERSONAL_PREFIX: &str = "PERSONAL";

/// Prefix used when a chat title yields no usable characters
pub const FALLBACK_GROUP_PREFIX: &str = "GRP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub readable_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub task_type: TaskType,
    pub author_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub assigned_user_id: Option<i64>,
    pub assigned_role_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task lives in the given scope
    pub fn belongs_to(&self, scope: &Scope) -> bool {
        match scope {
            Scope::Personal { user_id } => {
                self.task_type == TaskType::Personal && self.author_id == Some(*user_id)
            }
            Scope::Group { chat_id } => {
                self.task_type == TaskType::Group && self.chat_id == Some(*chat_id)
            }
        }
    }

    /// User who receives reminders: the assignee, else the author
    pub fn notification_target(&self) -> Option<i64> {
        self.assigned_user_id.or(self.author_id)
    }

    /// Identifier to show users, falling back to the numeric ID
    pub fn label(&self) -> String {
        self.readable_id.clone().unwrap_or_else(|| format!("#{}", self.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Personal,
    Group,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Personal => "personal",
            TaskType::Group => "group",
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "personal" => Ok(TaskType::Personal),
            "group" => Ok(TaskType::Group),
            _ => Err(format!("Unknown task type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" | "normal" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// The owner of a task set: one user or one chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scope {
    Personal { user_id: i64 },
    Group { chat_id: i64 },
}

impl Scope {
    pub fn task_type(&self) -> TaskType {
        match self {
            Scope::Personal { .. } => TaskType::Personal,
            Scope::Group { .. } => TaskType::Group,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Personal { user_id } => write!(f, "user:{}", user_id),
            Scope::Group { chat_id } => write!(f, "chat:{}", chat_id),
        }
    }
}

/// Readable-ID prefix: first three characters of the chat title, uppercased
pub fn readable_prefix(chat_title: Option<&str>) -> String {
    match chat_title {
        None => PERSONAL_PREFIX.to_string(),
        Some(title) => {
            let prefix: String = title
                .chars()
                .filter(|c| c.is_alphanumeric())
                .take(3)
                .flat_map(char::to_uppercase)
                .collect();
            if prefix.is_empty() {
                FALLBACK_GROUP_PREFIX.to_string()
            } else {
                prefix
            }
        }
    }
}

pub fn format_readable_id(prefix: &str, id: i64) -> String {
    format!("{}-{}", prefix, id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub task_type: TaskType,
    pub author_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub assigned_user_id: Option<i64>,
    pub assigned_role_id: Option<i64>,
    /// Combined with the generated numeric ID into the readable ID
    pub readable_prefix: String,
}

/// Partial task update.
///
/// `None` leaves a column untouched. For nullable columns `Some(None)` clears
/// the value and `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub is_completed: Option<bool>,
    pub assigned_user_id: Option<Option<i64>>,
    pub assigned_role_id: Option<Option<i64>>,
}

impl UpdateTaskRequest {
    pub fn is_empty(&self) -> bool {
        self == &UpdateTaskRequest::default()
    }

    /// Apply the supplied fields to a task in place; the readable ID is never touched
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(is_completed) = self.is_completed {
            task.is_completed = is_completed;
        }
        if let Some(assigned_user_id) = self.assigned_user_id {
            task.assigned_user_id = assigned_user_id;
        }
        if let Some(assigned_role_id) = self.assigned_role_id {
            task.assigned_role_id = assigned_role_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: 7,
            readable_id: Some("COR-7".to_string()),
            title: "Build API".to_string(),
            description: Some("REST endpoints".to_string()),
            priority: Priority::High,
            deadline: Some(now),
            is_completed: false,
            task_type: TaskType::Group,
            author_id: Some(1),
            chat_id: Some(3),
            assigned_user_id: Some(2),
            assigned_role_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_readable_prefix() {
        assert_eq!(readable_prefix(None), "PERSONAL");
        assert_eq!(readable_prefix(Some("chat team")), "CHA");
        assert_eq!(readable_prefix(Some("Хор")), "ХОР");
        assert_eq!(readable_prefix(Some("A-b")), "AB");
        assert_eq!(readable_prefix(Some("!!!")), "GRP");
        assert_eq!(format_readable_id("CHT", 123), "CHT-123");
    }

    #[test]
    fn test_apply_leaves_omitted_fields() {
        let task = sample_task();
        let mut updated = task.clone();
        let request = UpdateTaskRequest {
            title: Some("Build REST API".to_string()),
            ..Default::default()
        };
        request.apply_to(&mut updated);

        assert_eq!(updated.title, "Build REST API");
        assert_eq!(updated.description, task.description);
        assert_eq!(updated.deadline, task.deadline);
        assert_eq!(updated.assigned_user_id, task.assigned_user_id);
        assert_eq!(updated.readable_id, task.readable_id);
    }

    #[test]
    fn test_apply_explicit_null_clears() {
        let mut task = sample_task();
        let request = UpdateTaskRequest {
            deadline: Some(None),
            description: Some(None),
            ..Default::default()
        };
        request.apply_to(&mut task);
        assert!(task.deadline.is_none());
        assert!(task.description.is_none());
        assert_eq!(task.title, "Build API");
    }

    #[test]
    fn test_belongs_to_scope() {
        let task = sample_task();
        assert!(task.belongs_to(&Scope::Group { chat_id: 3 }));
        assert!(!task.belongs_to(&Scope::Group { chat_id: 4 }));
        assert!(!task.belongs_to(&Scope::Personal { user_id: 1 }));
    }

    #[test]
    fn test_notification_target_prefers_assignee() {
        let mut task = sample_task();
        assert_eq!(task.notification_target(), Some(2));
        task.assigned_user_id = None;
        assert_eq!(task.notification_target(), Some(1));
    }
}
