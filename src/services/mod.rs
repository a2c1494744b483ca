//! Services module
//!
//! This module contains business logic services

pub mod context;
pub mod extraction;
pub mod gemini;
pub mod messenger;
pub mod pipeline;
pub mod prompt;
pub mod reconciliation;
pub mod resolver;
pub mod response;
pub mod scheduler;

// Re-export commonly used services
pub use context::{AuthorDescriptor, ChatDescriptor, ContextAssembler, ConversationContext};
pub use extraction::{parse_model_response, ExtractionClient};
pub use gemini::{GeminiClient, LanguageModel};
pub use messenger::{Messenger, TelegramMessenger};
pub use pipeline::{InboundMessage, PipelineOutcome, PipelineReply, TaskPipeline};
pub use reconciliation::{ReconcileTarget, ReconciliationEngine, ReconciliationResult, ScopeLocks, TaskChange};
pub use response::{FormatContext, ResponseFormatter};
pub use scheduler::NotificationScheduler;

use std::sync::Arc;

use chrono::FixedOffset;

use crate::config::settings::Settings;
use crate::database::Store;
use crate::i18n::I18n;
use crate::utils::helpers::display_offset;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub store: Arc<dyn Store>,
    pub messenger: Arc<dyn Messenger>,
    pub i18n: I18n,
    pub assembler: ContextAssembler,
    pub pipeline: TaskPipeline,
    pub formatter: ResponseFormatter,
    pub scheduler: NotificationScheduler,
    /// Offset used when rendering and parsing deadlines
    pub offset: FixedOffset,
}

impl ServiceFactory {
    /// Wire every service from its collaborators
    pub fn new(
        settings: &Settings,
        store: Arc<dyn Store>,
        model: Arc<dyn LanguageModel>,
        messenger: Arc<dyn Messenger>,
        i18n: I18n,
    ) -> Self {
        let offset = display_offset(settings.bot.utc_offset_minutes);
        let locks = Arc::new(ScopeLocks::new());

        let assembler = ContextAssembler::new(store.clone());
        let pipeline = TaskPipeline::new(
            assembler.clone(),
            ExtractionClient::new(model),
            ReconciliationEngine::new(store.clone(), locks),
            i18n.clone(),
            offset,
        );

        let scheduler = NotificationScheduler::new(
            store.clone(),
            messenger.clone(),
            i18n.clone(),
            settings.scheduler.tick_seconds,
            offset,
        );

        Self {
            store,
            messenger,
            formatter: ResponseFormatter::new(i18n.clone()),
            i18n,
            assembler,
            pipeline,
            scheduler,
            offset,
        }
    }
}
