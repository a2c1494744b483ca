//! Group setup handlers
//!
//! Reacts to changes in the bot's own membership: greets a group when added,
//! asks for admin rights when missing and cleans the request up once granted.

use teloxide::{Bot, prelude::*, types::{ChatId, ChatMemberStatus, ChatMemberUpdated, MessageId, ParseMode}};
use tracing::{debug, info, warn};
use crate::utils::errors::Result;
use crate::services::ServiceFactory;
use crate::handlers::{chat_descriptor, BotProfile};
use crate::i18n::params;
use crate::models::{Chat, CreateChatRequest, UpdateChatRequest};
use crate::utils::helpers::escape_html;

/// What happened to the bot's membership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Added { is_admin: bool },
    Promoted,
    Removed,
    Unchanged,
}

fn is_present(status: ChatMemberStatus) -> bool {
    !matches!(status, ChatMemberStatus::Left | ChatMemberStatus::Banned)
}

fn is_admin(status: ChatMemberStatus) -> bool {
    matches!(status, ChatMemberStatus::Administrator | ChatMemberStatus::Owner)
}

pub fn classify(old: ChatMemberStatus, new: ChatMemberStatus) -> MembershipChange {
    match (is_present(old), is_present(new)) {
        (false, true) => MembershipChange::Added { is_admin: is_admin(new) },
        (true, false) => MembershipChange::Removed,
        (true, true) if !is_admin(old) && is_admin(new) => MembershipChange::Promoted,
        _ => MembershipChange::Unchanged,
    }
}

/// Handle `my_chat_member` updates
pub async fn handle_my_chat_member(
    bot: Bot,
    update: ChatMemberUpdated,
    services: ServiceFactory,
    profile: BotProfile,
) -> Result<()> {
    if update.new_chat_member.user.id != profile.id {
        return Ok(());
    }
    let Some(descriptor) = chat_descriptor(&update.chat) else {
        debug!(chat_id = update.chat.id.0, "Ignoring membership change outside groups");
        return Ok(());
    };

    let change = classify(update.old_chat_member.status(), update.new_chat_member.status());
    debug!(chat_id = update.chat.id.0, change = ?change, "Bot membership changed");

    let chat = services.store.upsert_chat(CreateChatRequest {
        telegram_id: descriptor.telegram_id,
        title: descriptor.title,
        username: descriptor.username,
    }).await?;
    let lang = services.i18n.detect_user_language(update.from.language_code.as_deref());

    match change {
        MembershipChange::Added { is_admin } => handle_bot_added_to_group(&bot, &services, update.chat.id, &chat, &lang, is_admin).await,
        MembershipChange::Promoted => handle_bot_promoted(&bot, &services, update.chat.id, &chat).await,
        MembershipChange::Removed => {
            info!(chat_id = chat.id, "Bot removed from group");
            Ok(())
        }
        MembershipChange::Unchanged => Ok(()),
    }
}

async fn handle_bot_added_to_group(
    bot: &Bot,
    services: &ServiceFactory,
    chat_id: ChatId,
    chat: &Chat,
    lang: &str,
    is_admin: bool,
) -> Result<()> {
    info!(chat_id = chat.id, is_admin = is_admin, "Bot added to group");

    let welcome = services.i18n.t("group.welcome", lang, Some(&params([("title", escape_html(&chat.title))])));
    let welcome_message = bot.send_message(chat_id, welcome).parse_mode(ParseMode::Html).await?;

    if let Err(e) = bot.pin_chat_message(chat_id, welcome_message.id).await {
        warn!(chat_id = chat.id, error = %e, "Failed to pin welcome message");
    }

    let mut update = UpdateChatRequest {
        welcome_message_id: Some(Some(welcome_message.id.0)),
        ..Default::default()
    };

    if !is_admin {
        let warning = services.i18n.t("group.need_admin", lang, None);
        let warning_message = bot.send_message(chat_id, warning).parse_mode(ParseMode::Html).await?;
        update.warning_message_id = Some(Some(warning_message.id.0));
    }

    services.store.update_chat(chat.id, update).await?;
    Ok(())
}

async fn handle_bot_promoted(bot: &Bot, services: &ServiceFactory, chat_id: ChatId, chat: &Chat) -> Result<()> {
    info!(chat_id = chat.id, "Bot promoted to administrator");

    let Some(warning_id) = chat.warning_message_id else {
        return Ok(());
    };

    if let Err(e) = bot.delete_message(chat_id, MessageId(warning_id)).await {
        warn!(chat_id = chat.id, message_id = warning_id, error = %e, "Failed to delete admin warning");
    }

    services.store.update_chat(chat.id, UpdateChatRequest {
        warning_message_id: Some(None),
        ..Default::default()
    }).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_membership_changes() {
        assert_eq!(
            classify(ChatMemberStatus::Left, ChatMemberStatus::Member),
            MembershipChange::Added { is_admin: false }
        );
        assert_eq!(
            classify(ChatMemberStatus::Left, ChatMemberStatus::Administrator),
            MembershipChange::Added { is_admin: true }
        );
        assert_eq!(
            classify(ChatMemberStatus::Member, ChatMemberStatus::Administrator),
            MembershipChange::Promoted
        );
        assert_eq!(classify(ChatMemberStatus::Administrator, ChatMemberStatus::Left), MembershipChange::Removed);
        assert_eq!(classify(ChatMemberStatus::Banned, ChatMemberStatus::Left), MembershipChange::Unchanged);
        assert_eq!(
            classify(ChatMemberStatus::Administrator, ChatMemberStatus::Member),
            MembershipChange::Unchanged
        );
    }
}
