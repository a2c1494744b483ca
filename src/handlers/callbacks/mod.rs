//! Callback query handlers module
//!
//! This module contains handlers for all inline keyboard button callbacks

pub mod group_setup;

use teloxide::{Bot, prelude::*, types::{CallbackQuery, ParseMode}};
use tracing::{debug, info, warn};
use crate::utils::errors::Result;
use crate::services::ServiceFactory;
use crate::handlers::author_descriptor;
use crate::handlers::commands::notifications::{menu_keyboard, menu_text, parse_callback_data, preset_label};
use crate::i18n::params;
use crate::models::{CreateUserRequest, TaskType, UpdateUserRequest};

/// Main callback query dispatcher
pub async fn handle_callback_query(bot: Bot, query: CallbackQuery, services: ServiceFactory) -> Result<()> {
    let user_id = query.from.id.0;
    debug!(user_id = user_id, callback_data = ?query.data, "Processing callback query");

    let Some((kind, preset)) = query.data.as_deref().and_then(parse_callback_data) else {
        warn!(user_id = user_id, callback_data = ?query.data, "Unknown callback data");
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };

    let author = author_descriptor(&query.from);
    let user = services.store.upsert_user(CreateUserRequest {
        telegram_id: author.telegram_id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        language_code: author.language_code,
    }).await?;

    let update = match kind {
        TaskType::Personal => UpdateUserRequest { personal_preset: Some(preset), ..Default::default() },
        TaskType::Group => UpdateUserRequest { group_preset: Some(preset), ..Default::default() },
    };
    let user = services.store.update_user(user.id, update).await?;
    let lang = services.i18n.detect_user_language(Some(&user.language_code));

    let saved = services.i18n.t(
        "commands.notifications.saved",
        &lang,
        Some(&params([
            ("kind", services.i18n.t(&format!("commands.notifications.kinds.{}", kind.as_str()), &lang, None)),
            ("preset", preset_label(&services.i18n, preset, &lang)),
        ])),
    );
    bot.answer_callback_query(query.id.clone()).text(saved).await?;

    if let Some(message) = &query.message {
        let edited = bot
            .edit_message_text(message.chat().id, message.id(), menu_text(&services.i18n, &user, &lang))
            .parse_mode(ParseMode::Html)
            .reply_markup(menu_keyboard(&services.i18n, &user, &lang))
            .await;
        if let Err(e) = edited {
            warn!(user_id = user_id, error = %e, "Failed to refresh notification menu");
        }
    }

    info!(user_id = user_id, kind = kind.as_str(), preset = preset.as_str(), "Notification preset updated");
    Ok(())
}
