//! Error handling for TaskMind
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for TaskMind application
#[derive(Error, Debug)]
pub enum TaskMindError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Telegram download error: {0}")]
    Download(#[from] teloxide::DownloadError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("Chat not found: {chat_id}")]
    ChatNotFound { chat_id: String },

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: i64 },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Errors at the language model boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Language model request timed out")]
    Timeout,

    #[error("Language model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Language model returned no candidates")]
    EmptyResponse,

    #[error("Language model request failed: {0}")]
    RequestFailed(String),
}

impl ExtractionError {
    /// Whether a single retry is worth attempting
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractionError::Timeout => true,
            ExtractionError::Api { status, .. } => *status == 429 || *status >= 500,
            ExtractionError::EmptyResponse => false,
            ExtractionError::RequestFailed(_) => false,
        }
    }
}

/// Result type alias for TaskMind operations
pub type Result<T> = std::result::Result<T, TaskMindError>;

/// Result type alias for language model operations
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

impl TaskMindError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            TaskMindError::Database(_) => false,
            TaskMindError::Migration(_) => false,
            TaskMindError::Telegram(_) => true,
            TaskMindError::Download(_) => true,
            TaskMindError::Extraction(e) => e.is_transient(),
            TaskMindError::Config(_) => false,
            TaskMindError::UserNotFound { .. } => false,
            TaskMindError::ChatNotFound { .. } => false,
            TaskMindError::TaskNotFound { .. } => false,
            TaskMindError::Http(_) => true,
            TaskMindError::Serialization(_) => false,
            TaskMindError::Io(_) => true,
            TaskMindError::UrlParse(_) => false,
            TaskMindError::RateLimitExceeded => true,
            TaskMindError::InvalidInput(_) => false,
            TaskMindError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TaskMindError::Database(_) => ErrorSeverity::Critical,
            TaskMindError::Migration(_) => ErrorSeverity::Critical,
            TaskMindError::Config(_) => ErrorSeverity::Critical,
            TaskMindError::TaskNotFound { .. } => ErrorSeverity::Warning,
            TaskMindError::RateLimitExceeded => ErrorSeverity::Warning,
            TaskMindError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_extraction_errors() {
        assert!(ExtractionError::Timeout.is_transient());
        assert!(ExtractionError::Api { status: 503, message: String::new() }.is_transient());
        assert!(ExtractionError::Api { status: 429, message: String::new() }.is_transient());
        assert!(!ExtractionError::Api { status: 400, message: String::new() }.is_transient());
        assert!(!ExtractionError::EmptyResponse.is_transient());
    }

    #[test]
    fn test_severity() {
        assert_eq!(TaskMindError::Config("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(TaskMindError::TaskNotFound { task_id: 1 }.severity(), ErrorSeverity::Warning);
        assert!(TaskMindError::Extraction(ExtractionError::Timeout).is_recoverable());
    }
}
