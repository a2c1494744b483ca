//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{TaskMindError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_database_config(&settings.database)?;
    validate_gemini_config(&settings.gemini)?;
    validate_scheduler_config(&settings.scheduler)?;
    validate_i18n_config(&settings.i18n)?;
    validate_logging_config(&settings.logging)?;
    validate_rate_limit_config(&settings.rate_limit)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(TaskMindError::Config(
            "Bot token is required".to_string()
        ));
    }

    // Real-world offsets span UTC-12:00 to UTC+14:00
    if !(-12 * 60..=14 * 60).contains(&config.utc_offset_minutes) {
        return Err(TaskMindError::Config(
            format!("UTC offset out of range: {} minutes", config.utc_offset_minutes)
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(TaskMindError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(TaskMindError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(TaskMindError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Gemini configuration
fn validate_gemini_config(config: &super::GeminiConfig) -> Result<()> {
    if config.api_key.is_empty() {
        return Err(TaskMindError::Config(
            "Gemini API key is required".to_string()
        ));
    }

    if config.model.is_empty() {
        return Err(TaskMindError::Config(
            "Gemini model is required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(TaskMindError::Config(
            "Gemini timeout must be greater than 0".to_string()
        ));
    }

    url::Url::parse(&config.api_url)?;

    Ok(())
}

/// Validate scheduler configuration
fn validate_scheduler_config(config: &super::SchedulerConfig) -> Result<()> {
    if config.tick_seconds == 0 {
        return Err(TaskMindError::Config(
            "Scheduler tick must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate internationalization configuration
fn validate_i18n_config(config: &super::I18nConfig) -> Result<()> {
    if config.default_language.is_empty() {
        return Err(TaskMindError::Config(
            "Default language is required".to_string()
        ));
    }

    if config.supported_languages.is_empty() {
        return Err(TaskMindError::Config(
            "At least one supported language is required".to_string()
        ));
    }

    if !config.supported_languages.contains(&config.default_language) {
        return Err(TaskMindError::Config(
            "Default language must be in supported languages list".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(TaskMindError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(TaskMindError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

/// Validate rate limit configuration
fn validate_rate_limit_config(config: &super::RateLimitSettings) -> Result<()> {
    if config.window_seconds == 0 {
        return Err(TaskMindError::Config(
            "Rate limit window must be greater than 0".to_string()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.bot.token = "12345:test_token".to_string();
        settings.gemini.api_key = "test-key".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_token_rejected() {
        let mut settings = valid_settings();
        settings.bot.token.clear();
        assert!(matches!(validate_settings(&settings), Err(TaskMindError::Config(_))));
    }

    #[test]
    fn test_missing_gemini_key_rejected() {
        let mut settings = valid_settings();
        settings.gemini.api_key.clear();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_connection_bounds() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_default_language_must_be_supported() {
        let mut settings = valid_settings();
        settings.i18n.default_language = "de".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut settings = valid_settings();
        settings.scheduler.tick_seconds = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_offset_range() {
        let mut settings = valid_settings();
        settings.bot.utc_offset_minutes = 15 * 60;
        assert!(validate_settings(&settings).is_err());
        settings.bot.utc_offset_minutes = -5 * 60;
        assert!(validate_settings(&settings).is_ok());
    }
}
