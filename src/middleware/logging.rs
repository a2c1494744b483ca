//! Logging middleware
//!
//! Records each inbound update and how long its handler took.

use std::time::Instant;
use teloxide::types::{ChatKind, MediaKind, Message, MessageKind, PublicChatKind, Update, UpdateKind};
use tracing::{debug, info, warn};

/// Chat kind name for logs
pub fn chat_kind(message: &Message) -> &'static str {
    match message.chat.kind {
        ChatKind::Public(ref public) => match public.kind {
            PublicChatKind::Group => "group",
            PublicChatKind::Supergroup(_) => "supergroup",
            PublicChatKind::Channel(_) => "channel",
        },
        ChatKind::Private(_) => "private",
    }
}

/// Payload kind name for logs
pub fn payload_kind(message: &Message) -> &'static str {
    match &message.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(_) => "text",
            MediaKind::Voice(_) => "voice",
            MediaKind::Audio(_) => "audio",
            MediaKind::Photo(_) => "photo",
            MediaKind::Document(_) => "document",
            _ => "other_media",
        },
        MessageKind::NewChatMembers(_) => "new_chat_members",
        MessageKind::LeftChatMember(_) => "left_chat_member",
        _ => "other",
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }

    /// Log an incoming update at info
    pub fn log_update(&self, update: &Update) {
        match &update.kind {
            UpdateKind::Message(message) => self.log_message(message),
            UpdateKind::CallbackQuery(callback) => {
                info!(
                    user_id = callback.from.id.0,
                    callback_data = callback.data.as_deref().unwrap_or("none"),
                    "Callback query received"
                );
            }
            UpdateKind::MyChatMember(member) => {
                info!(chat_id = member.chat.id.0, "Bot membership changed");
            }
            _ => debug!("Other update type received"),
        }
    }

    pub fn log_message(&self, message: &Message) {
        info!(
            user_id = message.from.as_ref().map(|u| u.id.0),
            chat_id = message.chat.id.0,
            chat_kind = chat_kind(message),
            payload = payload_kind(message),
            message_id = message.id.0,
            "Message received"
        );
    }

    /// Start timing a handler
    pub fn track(&self, operation: &'static str) -> HandlerTimer {
        HandlerTimer { operation, start_time: Instant::now() }
    }
}

/// Measures one handler invocation
pub struct HandlerTimer {
    operation: &'static str,
    start_time: Instant,
}

impl HandlerTimer {
    pub fn complete(self, success: bool) {
        let duration_ms = self.start_time.elapsed().as_millis();

        if success {
            debug!(operation = self.operation, duration_ms = duration_ms, "Handler completed");
        } else {
            warn!(operation = self.operation, duration_ms = duration_ms, "Handler failed");
        }

        if duration_ms > 10_000 {
            warn!(operation = self.operation, duration_ms = duration_ms, "Slow handler detected");
        }
    }
}
