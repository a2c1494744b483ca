//! Outbound messaging boundary
//!
//! The core only needs to send HTML text to a conversation and to fetch the
//! bytes of a voice message. `TelegramMessenger` provides both over teloxide.

use async_trait::async_trait;
use teloxide::{
    net::Download,
    payloads::SendMessageSetters,
    prelude::Request,
    requests::Requester,
    sugar::request::RequestLinkPreviewExt,
    types::{ChatId, ParseMode},
    Bot,
};
use tracing::{debug, error};

use crate::utils::errors::{Result, TaskMindError};

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML message to a chat identified by its platform ID
    async fn send_text(&self, chat: &str, html: &str) -> Result<()>;

    /// Download a file's raw bytes by platform file ID
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Parse a platform chat ID stored as text
pub fn parse_chat_id(chat: &str) -> Result<ChatId> {
    chat.trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| TaskMindError::InvalidInput(format!("Invalid chat id: {}", chat)))
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat: &str, html: &str) -> Result<()> {
        let chat_id = parse_chat_id(chat)?;

        let result = self.bot
            .send_message(chat_id, html)
            .parse_mode(ParseMode::Html)
            .disable_link_preview(true)
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(chat_id = %chat, "Message sent");
                Ok(())
            }
            Err(e) => {
                error!(chat_id = %chat, error = %e, "Failed to send message");
                Err(TaskMindError::Telegram(e))
            }
        }
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self.bot.get_file(file_id.to_string()).await?;

        let mut buffer = Vec::new();
        self.bot.download_file(&file.path, &mut buffer).await?;

        debug!(file_id = %file_id, bytes = buffer.len(), "File downloaded");
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_id() {
        assert_eq!(parse_chat_id("-1001234").unwrap(), ChatId(-1001234));
        assert_eq!(parse_chat_id(" 42 ").unwrap(), ChatId(42));
        assert!(parse_chat_id("abc").is_err());
    }
}
