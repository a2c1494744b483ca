//! Command handlers module
//!
//! This module contains handlers for all bot commands like /start, /help, etc.

pub mod start;
pub mod help;
pub mod tasks;
pub mod notifications;

use teloxide::{Bot, types::Message, utils::command::BotCommands};
use crate::utils::errors::Result;
use crate::services::ServiceFactory;

/// All available bot commands
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "TaskMind commands:")]
pub enum Command {
    #[command(description = "Start the bot and show welcome message")]
    Start,
    #[command(description = "Show help information")]
    Help,
    #[command(description = "List open tasks")]
    Tasks,
    #[command(description = "Configure deadline reminders")]
    Notifications,
}

/// Main command dispatcher
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, services: ServiceFactory) -> Result<()> {
    match cmd {
        Command::Start => start::handle_start(bot, msg, services).await,
        Command::Help => help::handle_help(bot, msg, services).await,
        Command::Tasks => tasks::handle_tasks(bot, msg, services).await,
        Command::Notifications => notifications::handle_notifications(bot, msg, services).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/tasks", "taskmind_bot").unwrap(), Command::Tasks);
        assert_eq!(Command::parse("/notifications", "taskmind_bot").unwrap(), Command::Notifications);
        assert_eq!(Command::parse("/start@taskmind_bot", "taskmind_bot").unwrap(), Command::Start);
        assert!(Command::parse("/events", "taskmind_bot").is_err());
    }
}
