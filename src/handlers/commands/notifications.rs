//! /notifications command handler
//!
//! Shows the user's reminder presets with an inline keyboard to change them.
//! Button callbacks carry `notify:<personal|group>:<preset>`.

use teloxide::{Bot, prelude::*, types::{InlineKeyboardButton, InlineKeyboardMarkup, Message, ParseMode}};
use tracing::debug;
use crate::utils::errors::{Result, TaskMindError};
use crate::services::ServiceFactory;
use crate::handlers::author_descriptor;
use crate::i18n::{params, I18n};
use crate::models::{CreateUserRequest, NotificationPreset, TaskType, User};

pub const CALLBACK_PREFIX: &str = "notify";

pub fn callback_data(kind: TaskType, preset: NotificationPreset) -> String {
    format!("{}:{}:{}", CALLBACK_PREFIX, kind.as_str(), preset.as_str())
}

/// Parse `notify:<kind>:<preset>`
pub fn parse_callback_data(data: &str) -> Option<(TaskType, NotificationPreset)> {
    let mut parts = data.split(':');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }
    let kind = parts.next()?.parse().ok()?;
    let preset = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((kind, preset))
}

pub fn preset_label(i18n: &I18n, preset: NotificationPreset, lang: &str) -> String {
    i18n.t(&format!("presets.{}", preset.as_str()), lang, None)
}

pub fn menu_text(i18n: &I18n, user: &User, lang: &str) -> String {
    let params = params([
        ("personal", preset_label(i18n, user.personal_preset, lang)),
        ("group", preset_label(i18n, user.group_preset, lang)),
    ]);
    i18n.t("commands.notifications.menu", lang, Some(&params))
}

/// One row per preset, personal on the left, group on the right
pub fn menu_keyboard(i18n: &I18n, user: &User, lang: &str) -> InlineKeyboardMarkup {
    let button = |kind: TaskType, preset: NotificationPreset| {
        let icon = match kind {
            TaskType::Personal => "👤",
            TaskType::Group => "👥",
        };
        let mark = if user.preset_for(kind) == preset { "✓ " } else { "" };
        InlineKeyboardButton::callback(
            format!("{}{} {}", mark, icon, preset_label(i18n, preset, lang)),
            callback_data(kind, preset),
        )
    };

    let rows: Vec<Vec<InlineKeyboardButton>> = NotificationPreset::ALL
        .iter()
        .map(|&preset| vec![button(TaskType::Personal, preset), button(TaskType::Group, preset)])
        .collect();

    InlineKeyboardMarkup::new(rows)
}

pub async fn handle_notifications(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let from = msg.from.as_ref().ok_or_else(|| {
        TaskMindError::InvalidInput("No user in message".to_string())
    })?;
    let author = author_descriptor(from);

    let user = services.store.upsert_user(CreateUserRequest {
        telegram_id: author.telegram_id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        language_code: author.language_code,
    }).await?;
    let lang = services.i18n.detect_user_language(Some(&user.language_code));

    debug!(user_id = user.id, "Showing notification settings");

    bot.send_message(msg.chat.id, menu_text(&services.i18n, &user, &lang))
        .parse_mode(ParseMode::Html)
        .reply_markup(menu_keyboard(&services.i18n, &user, &lang))
        .await?;

    Ok(())
}
