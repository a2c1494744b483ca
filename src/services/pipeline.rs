//! Message-to-task pipeline
//!
//! Context → Prompt → Extraction → Resolve → Reconcile → Format, for one
//! inbound message. Never fails: every error path ends in a localised reply.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::i18n::I18n;
use crate::models::{readable_prefix, ExtractionOutcome, MessagePayload};
use crate::services::context::{AuthorDescriptor, ChatDescriptor, ContextAssembler};
use crate::services::extraction::ExtractionClient;
use crate::services::prompt::{render_prompt, PromptTemplate};
use crate::services::reconciliation::{ReconcileTarget, ReconciliationEngine, ReconciliationResult};
use crate::services::resolver::resolve_names;
use crate::services::response::{FormatContext, ResponseFormatter};
use crate::utils::helpers::escape_html;
use crate::utils::logging::log_pipeline_stage;

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Absent only for HTTP group calls made without a user
    pub author: Option<AuthorDescriptor>,
    /// Present for group conversations
    pub chat: Option<ChatDescriptor>,
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum PipelineOutcome {
    Reconciled(ReconciliationResult),
    /// Model text shown to the user as-is
    Freeform(String),
    /// Context or model failure; nothing was written
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReply {
    /// HTML ready to send
    pub text: String,
    pub outcome: PipelineOutcome,
}

#[derive(Clone)]
pub struct TaskPipeline {
    assembler: ContextAssembler,
    extraction: ExtractionClient,
    engine: ReconciliationEngine,
    formatter: ResponseFormatter,
    i18n: I18n,
    offset: FixedOffset,
}

impl TaskPipeline {
    pub fn new(
        assembler: ContextAssembler,
        extraction: ExtractionClient,
        engine: ReconciliationEngine,
        i18n: I18n,
        offset: FixedOffset,
    ) -> Self {
        Self {
            assembler,
            extraction,
            engine,
            formatter: ResponseFormatter::new(i18n.clone()),
            i18n,
            offset,
        }
    }

    pub async fn process(&self, message: InboundMessage) -> PipelineReply {
        self.process_at(message, Utc::now()).await
    }

    /// Run the pipeline with an explicit current time
    pub async fn process_at(&self, message: InboundMessage, now: DateTime<Utc>) -> PipelineReply {
        let lang = self.i18n.detect_user_language(
            message.author.as_ref().and_then(|a| a.language_code.as_deref()),
        );

        let context = self.assembler.assemble(message.author.as_ref(), message.chat.as_ref()).await;
        let Some(scope) = context.scope() else {
            warn!("No scope could be resolved for inbound message");
            return self.failed(&lang);
        };
        let scope_label = scope.to_string();
        log_pipeline_stage(&scope_label, "context", None);

        let template = PromptTemplate::for_context(&context);
        let prompt = render_prompt(template, &context, message.payload.text(), now, self.offset);
        log_pipeline_stage(&scope_label, "prompt", Some(message.payload.kind()));

        let outcome = match self.extraction.extract(&prompt, &message.payload).await {
            Ok(outcome) => outcome,
            Err(_) => return self.failed(&lang),
        };

        let result = match outcome {
            ExtractionOutcome::Freeform(text) => {
                log_pipeline_stage(&scope_label, "freeform", None);
                let reply = if text.is_empty() {
                    self.formatter.none_found(&lang)
                } else {
                    escape_html(&text)
                };
                return PipelineReply { text: reply, outcome: PipelineOutcome::Freeform(text) };
            }
            ExtractionOutcome::Structured(result) => result,
        };

        let result = if context.is_group() {
            resolve_names(result, &context.members, &context.roles)
        } else {
            result
        };
        log_pipeline_stage(&scope_label, "resolved", None);

        let target = ReconcileTarget {
            scope,
            author_id: context.author_id(),
            readable_prefix: readable_prefix(context.chat.as_ref().map(|c| c.title.as_str())),
            offset: self.offset,
        };
        let reconciled = self.engine.reconcile(result, &target).await;

        let format_context = FormatContext {
            members: &context.members,
            roles: &context.roles,
            lang: &lang,
            offset: self.offset,
        };
        let text = self.formatter.format(&reconciled, &format_context);
        info!(
            scope = %scope_label,
            created = reconciled.created.len(),
            updated = reconciled.updated.len(),
            failed = reconciled.failures.len(),
            "Message processed"
        );

        PipelineReply { text, outcome: PipelineOutcome::Reconciled(reconciled) }
    }

    fn failed(&self, lang: &str) -> PipelineReply {
        PipelineReply {
            text: self.i18n.t("errors.generic", lang, None),
            outcome: PipelineOutcome::Failed,
        }
    }
}
