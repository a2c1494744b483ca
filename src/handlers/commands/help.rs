//! Help command handler

use teloxide::{Bot, prelude::*, types::{Message, ParseMode}};
use crate::utils::errors::Result;
use crate::services::ServiceFactory;

/// Handle /help command
pub async fn handle_help(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let lang = services
        .i18n
        .detect_user_language(msg.from.as_ref().and_then(|u| u.language_code.as_deref()));

    let help_text = services.i18n.t("commands.help.text", &lang, None);
    bot.send_message(msg.chat.id, help_text).parse_mode(ParseMode::Html).await?;

    Ok(())
}
