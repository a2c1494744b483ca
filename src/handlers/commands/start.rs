//! Start command handler
//!
//! Registers the user and greets them

use teloxide::{Bot, prelude::*, types::{Message, ParseMode}};
use tracing::{debug, info};
use crate::utils::errors::{Result, TaskMindError};
use crate::services::ServiceFactory;
use crate::handlers::{author_descriptor, chat_descriptor};
use crate::i18n::params;
use crate::utils::helpers::escape_html;

/// Handle /start: register the user (and the group, when sent in one) and greet
pub async fn handle_start(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let from = msg.from.as_ref().ok_or_else(|| {
        TaskMindError::InvalidInput("No user in message".to_string())
    })?;

    debug!(user_id = from.id.0, chat_id = msg.chat.id.0, "Processing /start command");

    let author = author_descriptor(from);
    let chat = chat_descriptor(&msg.chat);

    // Materialise user, chat and membership the same way the pipeline does
    let context = services.assembler.assemble(Some(&author), chat.as_ref()).await;
    let lang = services.i18n.detect_user_language(from.language_code.as_deref());

    let text = if context.is_group() {
        services.i18n.t("commands.start.group", &lang, None)
    } else {
        let name = context
            .author
            .as_ref()
            .map(|u| u.display_name())
            .unwrap_or_else(|| from.first_name.clone());
        let params = params([("name", escape_html(&name))]);
        services.i18n.t("commands.start.welcome", &lang, Some(&params))
    };

    bot.send_message(msg.chat.id, text).parse_mode(ParseMode::Html).await?;

    info!(
        user_id = from.id.0,
        registered = context.author.is_some(),
        group = context.is_group(),
        "User started bot"
    );
    Ok(())
}
