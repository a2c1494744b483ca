//! User model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

use super::task::TaskType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    /// Platform user ID, kept as text so 64-bit IDs never lose precision
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: String,
    pub personal_preset: NotificationPreset,
    pub group_preset: NotificationPreset,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name to show in task listings and diffs
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) => format!("{} {}", first, last),
            (Some(first), None, _) => first.clone(),
            (None, _, Some(username)) => format!("@{}", username),
            _ => format!("#{}", self.telegram_id),
        }
    }

    /// Preset governing reminders for tasks of the given type
    pub fn preset_for(&self, task_type: TaskType) -> NotificationPreset {
        match task_type {
            TaskType::Personal => self.personal_preset,
            TaskType::Group => self.group_preset,
        }
    }
}

/// Named reminder cadence a user picks per task type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_preset", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationPreset {
    Off,
    Minimal,
    Standard,
    Frequent,
    Maximum,
}

impl NotificationPreset {
    pub const ALL: [NotificationPreset; 5] = [
        NotificationPreset::Off,
        NotificationPreset::Minimal,
        NotificationPreset::Standard,
        NotificationPreset::Frequent,
        NotificationPreset::Maximum,
    ];

    /// Lead times before a deadline, longest first
    pub fn intervals(&self) -> Vec<Duration> {
        match self {
            NotificationPreset::Off => vec![],
            NotificationPreset::Minimal => vec![Duration::days(1)],
            NotificationPreset::Standard => vec![Duration::days(1), Duration::hours(1)],
            NotificationPreset::Frequent => vec![
                Duration::days(1),
                Duration::hours(3),
                Duration::hours(1),
                Duration::minutes(15),
            ],
            NotificationPreset::Maximum => vec![
                Duration::days(3),
                Duration::days(1),
                Duration::hours(6),
                Duration::hours(3),
                Duration::hours(1),
                Duration::minutes(30),
                Duration::minutes(15),
            ],
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, NotificationPreset::Off)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPreset::Off => "off",
            NotificationPreset::Minimal => "minimal",
            NotificationPreset::Standard => "standard",
            NotificationPreset::Frequent => "frequent",
            NotificationPreset::Maximum => "maximum",
        }
    }
}

impl std::str::FromStr for NotificationPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(NotificationPreset::Off),
            "minimal" => Ok(NotificationPreset::Minimal),
            "standard" => Ok(NotificationPreset::Standard),
            "frequent" => Ok(NotificationPreset::Frequent),
            "maximum" => Ok(NotificationPreset::Maximum),
            _ => Err(format!("Unknown notification preset: {}", s)),
        }
    }
}

impl Default for NotificationPreset {
    fn default() -> Self {
        NotificationPreset::Standard
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub personal_preset: Option<NotificationPreset>,
    pub group_preset: Option<NotificationPreset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_intervals_are_descending() {
        for preset in NotificationPreset::ALL {
            let intervals = preset.intervals();
            assert!(intervals.windows(2).all(|w| w[0] > w[1]), "{:?}", preset);
        }
        assert!(NotificationPreset::Off.intervals().is_empty());
    }

    #[test]
    fn test_preset_parse_roundtrip_names() {
        for preset in NotificationPreset::ALL {
            assert_eq!(preset.as_str().parse::<NotificationPreset>().unwrap(), preset);
        }
        assert!("hourly".parse::<NotificationPreset>().is_err());
    }
}
