//! Task repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::task::{Task, CreateTaskRequest, UpdateTaskRequest, format_readable_id};
use crate::utils::errors::TaskMindError;

const TASK_COLUMNS: &str = "id, readable_id, title, description, priority, deadline, is_completed, task_type, author_id, chat_id, assigned_user_id, assigned_role_id, created_at, updated_at";

/// Open tasks first, nearest deadline first
const TASK_ORDER: &str = "ORDER BY is_completed, deadline ASC NULLS LAST, id";

#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a task and assign its readable ID in the same transaction
    pub async fn create(&self, request: CreateTaskRequest) -> Result<Task, TaskMindError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO tasks (title, description, priority, deadline, task_type, author_id, chat_id,
                               assigned_user_id, assigned_role_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING id
            "#
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.priority)
        .bind(request.deadline)
        .bind(request.task_type)
        .bind(request.author_id)
        .bind(request.chat_id)
        .bind(request.assigned_user_id)
        .bind(request.assigned_role_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET readable_id = $2 WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(format_readable_id(&request.readable_prefix, id))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Task>, TaskMindError> {
        let task = sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    /// Personal tasks authored by a user
    pub async fn list_personal(&self, user_id: i64) -> Result<Vec<Task>, TaskMindError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE task_type = 'personal' AND author_id = $1 {TASK_ORDER}"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Group tasks of a chat
    pub async fn list_for_chat(&self, chat_id: i64) -> Result<Vec<Task>, TaskMindError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE task_type = 'group' AND chat_id = $1 {TASK_ORDER}"
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Partial update.
    ///
    /// Nullable columns carry a "supplied" flag so an omitted field is left as is
    /// while an explicit `None` clears it. `readable_id` is not part of the statement.
    pub async fn update(&self, id: i64, request: UpdateTaskRequest) -> Result<Task, TaskMindError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                priority = COALESCE($5, priority),
                deadline = CASE WHEN $6 THEN $7 ELSE deadline END,
                is_completed = COALESCE($8, is_completed),
                assigned_user_id = CASE WHEN $9 THEN $10 ELSE assigned_user_id END,
                assigned_role_id = CASE WHEN $11 THEN $12 ELSE assigned_role_id END,
                updated_at = $13
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title)
        .bind(request.description.is_some())
        .bind(request.description.flatten())
        .bind(request.priority)
        .bind(request.deadline.is_some())
        .bind(request.deadline.flatten())
        .bind(request.is_completed)
        .bind(request.assigned_user_id.is_some())
        .bind(request.assigned_user_id.flatten())
        .bind(request.assigned_role_id.is_some())
        .bind(request.assigned_role_id.flatten())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        task.ok_or(TaskMindError::TaskNotFound { task_id: id })
    }

    /// Incomplete tasks whose deadline is strictly after `now`
    pub async fn list_pending_with_deadline_after(&self, now: DateTime<Utc>) -> Result<Vec<Task>, TaskMindError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE is_completed = FALSE AND deadline IS NOT NULL AND deadline > $1
            ORDER BY deadline
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }
}
