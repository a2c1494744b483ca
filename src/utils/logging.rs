//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the TaskMind application.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::{TaskMindError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held by `main`.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "taskmind.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| TaskMindError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a pipeline stage transition for one inbound message
pub fn log_pipeline_stage(scope: &str, stage: &str, details: Option<&str>) {
    debug!(
        scope = scope,
        stage = stage,
        details = details,
        "Pipeline stage reached"
    );
}

/// Log the outcome of a reconciliation batch
pub fn log_reconciliation(scope: &str, created: usize, updated: usize, failed: usize) {
    if failed > 0 {
        warn!(
            scope = scope,
            created = created,
            updated = updated,
            failed = failed,
            "Reconciliation finished with failures"
        );
    } else {
        info!(
            scope = scope,
            created = created,
            updated = updated,
            "Reconciliation finished"
        );
    }
}

/// Log a deadline reminder delivery attempt
pub fn log_notification(task_id: i64, target: &str, interval_secs: i64, success: bool) {
    if success {
        info!(
            task_id = task_id,
            target = target,
            interval_secs = interval_secs,
            "Deadline reminder sent"
        );
    } else {
        warn!(
            task_id = task_id,
            target = target,
            interval_secs = interval_secs,
            "Deadline reminder delivery failed"
        );
    }
}

/// Log API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}
