//! Message handlers module
//!
//! Routes text and voice messages into the task pipeline and records new
//! group members so they can be assigned tasks by name.

use teloxide::{Bot, types::Message};
use tracing::{debug, error, info, warn};
use crate::utils::errors::Result;
use crate::services::{InboundMessage, ServiceFactory};
use crate::handlers::{author_descriptor, chat_descriptor, BotProfile};
use crate::middleware::{LoggingMiddleware, RateLimitMiddleware};
use crate::models::{CreateChatRequest, CreateUserRequest, MessagePayload};

pub const DEFAULT_VOICE_MIME: &str = "audio/ogg";

/// Whether `text` contains `@username` as a whole token
pub fn mentions(text: &str, username: &str) -> bool {
    let mention = format!("@{}", username.trim_start_matches('@')).to_lowercase();
    text.split_whitespace()
        .map(|word| word.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_').to_lowercase())
        .any(|word| word == mention)
}

/// Remove the bot mention so the model only sees the request
pub fn strip_mention(text: &str, username: &str) -> String {
    let mention = format!("@{}", username.trim_start_matches('@')).to_lowercase();
    text.lines()
        .map(|line| {
            line.split_whitespace()
                .filter(|word| {
                    word.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_').to_lowercase() != mention
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Group text only reaches the pipeline when addressed to the bot; voice always does
pub fn should_process(is_group: bool, has_voice: bool, addressed: bool) -> bool {
    !is_group || has_voice || addressed
}

fn is_addressed(msg: &Message, profile: &BotProfile) -> bool {
    let mentioned = match (msg.text(), profile.username.as_deref()) {
        (Some(text), Some(username)) => mentions(text, username),
        _ => false,
    };
    let replied = msg
        .reply_to_message()
        .and_then(|reply| reply.from.as_ref())
        .is_some_and(|user| user.id == profile.id);

    mentioned || replied
}

/// Handle incoming text and voice messages
pub async fn handle_message(
    _bot: Bot,
    msg: Message,
    services: ServiceFactory,
    profile: BotProfile,
    limiter: RateLimitMiddleware,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }

    let logging = LoggingMiddleware::new();
    logging.log_message(&msg);

    let chat = chat_descriptor(&msg.chat);
    let voice = msg.voice();
    if msg.text().is_none() && voice.is_none() {
        debug!(chat_id = msg.chat.id.0, "Ignoring message without text or voice");
        return Ok(());
    }
    if !should_process(chat.is_some(), voice.is_some(), is_addressed(&msg, &profile)) {
        return Ok(());
    }

    let chat_target = msg.chat.id.0.to_string();
    let lang = services.i18n.detect_user_language(user.language_code.as_deref());

    if limiter.check_rate_limit(user.id.0).is_err() {
        let text = services.i18n.t("errors.rate_limited", &lang, None);
        return services.messenger.send_text(&chat_target, &text).await;
    }

    let timer = logging.track("pipeline");

    let payload = match voice {
        Some(voice) => match services.messenger.download_file(&voice.file.id).await {
            Ok(bytes) => MessagePayload::Audio {
                bytes,
                mime_type: voice
                    .mime_type
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| DEFAULT_VOICE_MIME.to_string()),
            },
            Err(e) => {
                error!(user_id = user.id.0, error = %e, "Failed to download voice message");
                timer.complete(false);
                let text = services.i18n.t("errors.download_failed", &lang, None);
                return services.messenger.send_text(&chat_target, &text).await;
            }
        },
        None => {
            let text = msg.text().unwrap_or_default();
            let text = match profile.username.as_deref() {
                Some(username) if chat.is_some() => strip_mention(text, username),
                _ => text.to_string(),
            };
            MessagePayload::Text(text)
        }
    };

    let reply = services
        .pipeline
        .process(InboundMessage {
            author: Some(author_descriptor(user)),
            chat,
            payload,
        })
        .await;

    let sent = services.messenger.send_text(&chat_target, &reply.text).await;
    timer.complete(sent.is_ok());
    sent
}

/// Record human members joining a group
pub async fn handle_new_chat_member(_bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let (Some(new_members), Some(descriptor)) = (msg.new_chat_members(), chat_descriptor(&msg.chat)) else {
        return Ok(());
    };

    let chat = services.store.upsert_chat(CreateChatRequest {
        telegram_id: descriptor.telegram_id,
        title: descriptor.title,
        username: descriptor.username,
    }).await?;

    for member in new_members.iter().filter(|m| !m.is_bot) {
        let author = author_descriptor(member);
        let user = match services.store.upsert_user(CreateUserRequest {
            telegram_id: author.telegram_id,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            language_code: author.language_code,
        }).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = member.id.0, error = %e, "Failed to register new member");
                continue;
            }
        };

        services.store.ensure_membership(chat.id, user.id).await?;
        info!(chat_id = chat.id, user_id = user.id, "New member recorded");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions() {
        assert!(mentions("@TaskMindBot move the deadline", "taskmindbot"));
        assert!(mentions("hey @taskmindbot, add a task", "@TaskMindBot"));
        assert!(!mentions("email me at someone@taskmindbot.dev", "taskmindbot"));
        assert!(!mentions("@taskmindbot_fan is here", "taskmindbot"));
    }

    #[test]
    fn test_strip_mention() {
        assert_eq!(strip_mention("@TaskMindBot buy milk", "taskmindbot"), "buy milk");
        assert_eq!(strip_mention("buy   milk", "taskmindbot"), "buy milk");
        assert_eq!(strip_mention("@taskmindbot\nbuy milk\ncall mom", "taskmindbot"), "buy milk\ncall mom");
    }

    #[test]
    fn test_should_process() {
        assert!(should_process(false, false, false));
        assert!(should_process(true, true, false));
        assert!(should_process(true, false, true));
        assert!(!should_process(true, false, false));
    }
}
