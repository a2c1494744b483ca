//! /tasks command handler
//!
//! Lists open tasks for the scope the command was sent in.

use teloxide::{Bot, prelude::*, types::{Message, ParseMode}};
use tracing::debug;
use crate::utils::errors::Result;
use crate::services::{FormatContext, ServiceFactory};
use crate::handlers::{author_descriptor, chat_descriptor};

pub async fn handle_tasks(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let author = msg.from.as_ref().map(author_descriptor);
    let chat = chat_descriptor(&msg.chat);
    let lang = services
        .i18n
        .detect_user_language(msg.from.as_ref().and_then(|u| u.language_code.as_deref()));

    let context = services.assembler.assemble(author.as_ref(), chat.as_ref()).await;
    if context.scope().is_none() {
        let text = services.i18n.t("errors.generic", &lang, None);
        bot.send_message(msg.chat.id, text).await?;
        return Ok(());
    }

    let format_context = FormatContext {
        members: &context.members,
        roles: &context.roles,
        lang: &lang,
        offset: services.offset,
    };
    let text = services.formatter.format_task_list(&context.tasks, &format_context);

    debug!(scope = ?context.scope(), tasks = context.tasks.len(), "Listing tasks");
    bot.send_message(msg.chat.id, text).parse_mode(ParseMode::Html).await?;

    Ok(())
}
