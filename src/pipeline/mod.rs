//! Pipelines
//!
//! Non-streaming and streaming request pipelines sharing one context: the
//! provider collaborator, tool registry, history, usage sink and retry policy.
//!
//! A user turn collects its messages in a private buffer and only reaches the
//! history store once it completes. A failed or dropped turn leaves history
//! as it was.

pub mod chat;
pub mod stream;

pub use chat::ChatPipeline;
pub use stream::StreamingPipeline;

use std::sync::Arc;
use tracing::Span;

use crate::config::PipelineConfig;
use crate::history::{HistoryStore, InMemoryHistory};
use crate::provider::ProviderCall;
use crate::retry::RetryExecutor;
use crate::tools::{ToolExecutor, ToolOrchestrator, ToolRegistry};
use crate::types::{ChatMessage, ChatRequest, CommonParams, ProviderOptions, Usage};
use crate::usage::UsageSink;

/// Everything a pipeline needs for one client.
#[derive(Clone)]
pub struct PipelineContext {
    pub provider: Arc<dyn ProviderCall>,
    pub registry: Arc<ToolRegistry>,
    pub history: Arc<dyn HistoryStore>,
    pub usage_sink: Option<Arc<dyn UsageSink>>,
    pub retry: RetryExecutor,
    pub config: PipelineConfig,
    pub model: String,
    pub params: CommonParams,
    pub provider_options: ProviderOptions,
    pub span: Span,
}

impl PipelineContext {
    /// Report a usage delta. Sink failures are logged and swallowed.
    pub fn record_usage(&self, usage: &Usage) {
        if let Some(sink) = &self.usage_sink
            && let Err(error) = sink.record(usage)
        {
            tracing::warn!(parent: &self.span, error = %error, "usage sink failed");
        }
    }

    /// A fresh orchestrator for one user turn.
    pub fn orchestrator(&self) -> ToolOrchestrator {
        let executor = ToolExecutor::new(self.registry.clone()).with_span(self.span.clone());
        ToolOrchestrator::new(executor, self.config.max_iterations)
            .with_parallel_tool_calls(self.config.parallel_tool_calls)
            .with_span(self.span.clone())
    }

    /// Request for a turn in progress: the committed history followed by the
    /// messages the turn has produced so far.
    pub fn turn_request(&self, turn: &InMemoryHistory) -> ChatRequest {
        let mut messages = self.history.all();
        messages.extend(turn.all());
        self.prepare_request(messages)
    }

    /// Move a completed turn into the history store.
    pub fn commit_turn(&self, turn: &InMemoryHistory) {
        self.history.append(turn.take());
    }

    /// Build the provider request for `messages`, advertising every registered tool.
    ///
    /// Provider options aimed at a different provider are dropped.
    pub fn prepare_request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        let provider_id = self.provider.provider_id();
        let options = if self.provider_options.is_none()
            || self.provider_options.is_for_provider(provider_id)
        {
            self.provider_options.clone()
        } else {
            tracing::warn!(
                parent: &self.span,
                provider = provider_id,
                options_for = self.provider_options.provider_id().unwrap_or_default(),
                "dropping provider options for a different provider"
            );
            ProviderOptions::None
        };

        ChatRequest::new(self.model.clone(), messages)
            .with_tools(self.registry.specs())
            .with_params(self.params.clone())
            .with_provider_options(options)
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("provider", &self.provider.provider_id())
            .field("model", &self.model)
            .field("tools", &self.registry.names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
