//! Non-streaming pipeline

use std::sync::Arc;

use super::PipelineContext;
use crate::error::LlmError;
use crate::history::{HistoryStore, InMemoryHistory};
use crate::types::{ChatMessage, ChatResponse};

/// Request/response turns with the tool loop and whole-call retries.
#[derive(Debug, Clone)]
pub struct ChatPipeline {
    ctx: Arc<PipelineContext>,
}

impl ChatPipeline {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    /// Run one user turn.
    ///
    /// The provider is called until it answers without tool calls. Each
    /// round-trip is retried as a whole. On success the user message, the tool
    /// exchanges and the final assistant text are appended to history; on
    /// error history is unchanged.
    pub async fn call(&self, message: ChatMessage) -> Result<ChatResponse, LlmError> {
        let ctx = &self.ctx;
        let turn = InMemoryHistory::with_messages(vec![message]);

        let mut orchestrator = ctx.orchestrator();
        orchestrator.reset_iteration_count();

        loop {
            let request = ctx.turn_request(&turn);
            let response = ctx
                .retry
                .execute(|| ctx.provider.chat(&request))
                .await?;

            if let Some(usage) = &response.usage {
                ctx.record_usage(usage);
            }

            let outcome = orchestrator
                .process(&response, &turn)
                .await?;
            if outcome.requires_resubmission {
                tracing::debug!(
                    parent: &ctx.span,
                    iteration = orchestrator.iteration_count(),
                    "resubmitting with tool results"
                );
                continue;
            }

            turn.append(vec![ChatMessage::assistant(response.text.clone())]);
            ctx.commit_turn(&turn);
            return Ok(response);
        }
    }
}
