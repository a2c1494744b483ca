//! Bot handlers module
//!
//! This module contains all Telegram bot handlers organized by type:
//! - Command handlers for bot commands
//! - Callback handlers for inline keyboard interactions
//! - Message handlers for text and voice messages

pub mod commands;
pub mod callbacks;
pub mod messages;

use teloxide::types::{Chat, User, UserId};

use crate::services::{AuthorDescriptor, ChatDescriptor};

// Re-export commonly used handler functions
pub use commands::{handle_command, Command};
pub use callbacks::handle_callback_query;
pub use callbacks::group_setup::handle_my_chat_member;
pub use messages::handle_message;

/// Who the bot is, resolved once at startup
#[derive(Debug, Clone)]
pub struct BotProfile {
    pub id: UserId,
    /// Without the leading '@'
    pub username: Option<String>,
}

pub fn author_descriptor(user: &User) -> AuthorDescriptor {
    AuthorDescriptor {
        telegram_id: user.id.0.to_string(),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
        language_code: user.language_code.clone(),
    }
}

/// Descriptor for group chats; private chats have none
pub fn chat_descriptor(chat: &Chat) -> Option<ChatDescriptor> {
    if !(chat.is_group() || chat.is_supergroup()) {
        return None;
    }

    Some(ChatDescriptor {
        telegram_id: chat.id.0.to_string(),
        title: chat.title().map(str::to_string),
        username: chat.username().map(str::to_string),
    })
}
