//! TaskMind Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use std::time::Duration;
use teloxide::{prelude::*, types::{CallbackQuery, ChatMemberUpdated, Update}};
use teloxide::dispatching::UpdateHandler;
use tracing::{info, warn, error};

use taskmind::{
    api::{self, AppState},
    config::Settings,
    utils::logging,
    database::{DatabaseService, Store, create_pool, run_migrations},
    services::{GeminiClient, LanguageModel, Messenger, ServiceFactory, TelegramMessenger},
    i18n::I18n,
    middleware::{LoggingMiddleware, RateLimitConfig, RateLimitMiddleware},
    handlers::{
        BotProfile, Command,
        commands::handle_command,
        callbacks::handle_callback_query,
        callbacks::group_setup::handle_my_chat_member,
        messages::{handle_message, handle_new_chat_member},
    },
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", taskmind::info());

    info!("Connecting to database...");
    let db_pool = create_pool(&settings.database).await?;

    info!("Running database migrations...");
    run_migrations(&db_pool).await?;

    let store: Arc<dyn Store> = Arc::new(DatabaseService::new(db_pool));

    info!("Loading translations...");
    let mut i18n = I18n::new(&settings.i18n);
    i18n.load_translations().await?;

    let bot = Bot::new(&settings.bot.token);
    let me = bot.get_me().await?;
    let profile = BotProfile {
        id: me.id,
        username: settings.bot.username.clone().or_else(|| me.username.clone()),
    };
    info!(bot_id = me.id.0, username = ?profile.username, "Bot identity resolved");

    info!("Initializing services...");
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));
    let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(settings.gemini.clone())?);
    let services = ServiceFactory::new(&settings, store, model, messenger, i18n);

    if settings.scheduler.enabled {
        tokio::spawn(services.scheduler.clone().run());
    } else {
        info!("Notification scheduler disabled");
    }

    if settings.api.enabled {
        let state = AppState::new(services.clone(), settings.api.max_upload_bytes);
        let addr = settings.api.bind_address();
        tokio::spawn(async move {
            if let Err(e) = api::serve(addr, state).await {
                error!(error = %e, "API server stopped");
            }
        });
    }

    let limiter = RateLimitMiddleware::new(RateLimitConfig::from(&settings.rate_limit));
    let cleanup_limiter = limiter.clone();
    let cleanup_every = Duration::from_secs(settings.rate_limit.window_seconds.max(1) * 2);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_every);
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup_old_entries();
        }
    });

    let mut dispatcher = Dispatcher::builder(bot.clone(), create_handler())
        .dependencies(dptree::deps![services, profile, limiter])
        .default_handler(|upd| async move {
            LoggingMiddleware::new().log_update(&upd);
            warn!("Unhandled update");
        })
        .enable_ctrlc_handler()
        .build();

    info!("TaskMind bot is ready, starting polling...");
    dispatcher.dispatch().await;

    info!("TaskMind bot has been shut down.");
    Ok(())
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_commands),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.new_chat_members().is_some())
                        .endpoint(handle_new_members),
                )
                .branch(dptree::endpoint(handle_messages)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callbacks))
        .branch(Update::filter_my_chat_member().endpoint(handle_chat_member_updates))
}

async fn handle_commands(bot: Bot, msg: Message, cmd: Command, services: ServiceFactory) -> HandlerResult {
    LoggingMiddleware::new().log_message(&msg);

    if let Err(e) = handle_command(bot, msg, cmd, services).await {
        error!(error = %e, severity = %e.severity(), recoverable = e.is_recoverable(), "Error handling command");
        return Err(e.into());
    }
    Ok(())
}

async fn handle_messages(
    bot: Bot,
    msg: Message,
    services: ServiceFactory,
    profile: BotProfile,
    limiter: RateLimitMiddleware,
) -> HandlerResult {
    if let Err(e) = handle_message(bot, msg, services, profile, limiter).await {
        error!(error = %e, severity = %e.severity(), recoverable = e.is_recoverable(), "Error handling message");
        return Err(e.into());
    }
    Ok(())
}

async fn handle_new_members(bot: Bot, msg: Message, services: ServiceFactory) -> HandlerResult {
    if let Err(e) = handle_new_chat_member(bot, msg, services).await {
        error!(error = %e, severity = %e.severity(), recoverable = e.is_recoverable(), "Error handling new chat member");
        return Err(e.into());
    }
    Ok(())
}

async fn handle_callbacks(bot: Bot, query: CallbackQuery, services: ServiceFactory) -> HandlerResult {
    if let Err(e) = handle_callback_query(bot, query, services).await {
        error!(error = %e, severity = %e.severity(), recoverable = e.is_recoverable(), "Error handling callback query");
        return Err(e.into());
    }
    Ok(())
}

/// Bot added, removed or promoted in a group
async fn handle_chat_member_updates(
    bot: Bot,
    update: ChatMemberUpdated,
    services: ServiceFactory,
    profile: BotProfile,
) -> HandlerResult {
    if let Err(e) = handle_my_chat_member(bot, update, services, profile).await {
        error!(error = %e, severity = %e.severity(), recoverable = e.is_recoverable(), "Error handling bot membership change");
        return Err(e.into());
    }
    Ok(())
}
