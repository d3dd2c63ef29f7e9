//! LLM Client
//!
//! The facade applications use: one client per conversation, wrapping a
//! provider collaborator with the chat and streaming pipelines.
//!
//! # Example Usage
//! ```rust,ignore
//! use llm_orchestra::prelude::*;
//!
//! let client = LlmClient::builder()
//!     .provider(my_provider)
//!     .model("gpt-4o-mini")
//!     .tool(weather_tool)
//!     .config(PipelineConfig::new().with_max_iterations(4))
//!     .build()?;
//!
//! let response = client.call(ChatMessage::user("Weather in Oslo?")).await?;
//! ```

use std::sync::Arc;
use tracing::Span;

use crate::config::PipelineConfig;
use crate::error::LlmError;
use crate::history::{HistoryStore, InMemoryHistory};
use crate::pipeline::{ChatPipeline, PipelineContext, StreamingPipeline};
use crate::provider::ProviderCall;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::tools::{ToolDefinition, ToolRegistry};
use crate::types::{ChatMessage, ChatResponse, ChunkStream, CommonParams, ProviderOptions};
use crate::usage::UsageSink;
use crate::utils::cancel::{CancelHandle, make_cancellable_stream};

/// Client facade over one provider and one conversation.
#[derive(Debug, Clone)]
pub struct LlmClient {
    ctx: Arc<PipelineContext>,
    chat: ChatPipeline,
    streaming: StreamingPipeline,
}

impl LlmClient {
    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    fn from_context(ctx: PipelineContext) -> Self {
        let ctx = Arc::new(ctx);
        Self {
            chat: ChatPipeline::new(ctx.clone()),
            streaming: StreamingPipeline::new(ctx.clone()),
            ctx,
        }
    }

    /// Run one non-streaming user turn, including any tool loop.
    pub async fn call(&self, message: ChatMessage) -> Result<ChatResponse, LlmError> {
        self.chat.call(message).await
    }

    /// Stream a single stateless round for `messages`.
    pub fn stream(&self, messages: Vec<ChatMessage>) -> ChunkStream {
        self.streaming.stream(messages)
    }

    /// Stream one user turn, running tools between rounds.
    pub fn stream_with_tools(&self, message: ChatMessage) -> ChunkStream {
        self.streaming.stream_with_tools(message)
    }

    /// Like [`Self::stream_with_tools`], with a handle that stops the turn.
    pub fn stream_with_cancel(&self, message: ChatMessage) -> (ChunkStream, CancelHandle) {
        make_cancellable_stream(self.stream_with_tools(message))
    }

    /// Register a tool, returning the definition it replaced.
    pub fn add_tool(&self, tool: ToolDefinition) -> Option<ToolDefinition> {
        self.ctx.registry.add(tool)
    }

    pub fn remove_tool(&self, name: &str) -> Option<ToolDefinition> {
        self.ctx.registry.remove(name)
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.ctx.history
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.ctx.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.ctx.config
    }
}

/// Builder for [`LlmClient`].
#[derive(Default)]
pub struct LlmClientBuilder {
    provider: Option<Arc<dyn ProviderCall>>,
    model: Option<String>,
    history: Option<Arc<dyn HistoryStore>>,
    usage_sink: Option<Arc<dyn UsageSink>>,
    registry: Option<Arc<ToolRegistry>>,
    tools: Vec<ToolDefinition>,
    config: PipelineConfig,
    params: CommonParams,
    provider_options: ProviderOptions,
    span: Option<Span>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: impl ProviderCall + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn provider_arc(mut self, provider: Arc<dyn ProviderCall>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Use an existing history store instead of a fresh in-memory one.
    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn usage_sink(mut self, sink: Arc<dyn UsageSink>) -> Self {
        self.usage_sink = Some(sink);
        self
    }

    /// Share a tool registry with other clients.
    pub fn registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn params(mut self, params: CommonParams) -> Self {
        self.params = params;
        self
    }

    pub fn provider_options(mut self, options: ProviderOptions) -> Self {
        self.provider_options = options;
        self
    }

    /// Span every component of this client logs under.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<LlmClient, LlmError> {
        self.config.validate_config()?;

        let provider = self.provider.ok_or_else(|| {
            LlmError::ConfigurationError("a provider is required".to_string())
        })?;
        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| LlmError::ConfigurationError("a model is required".to_string()))?;

        let span = self.span.unwrap_or_else(|| {
            tracing::info_span!("llm_client", provider = provider.provider_id(), model = %model)
        });

        let registry = self.registry.unwrap_or_default();
        for tool in self.tools {
            registry.add(tool);
        }

        let retry = RetryExecutor::new(RetryPolicy::from(&self.config.retry)).with_span(span.clone());

        tracing::debug!(
            parent: &span,
            tools = registry.len(),
            max_iterations = self.config.max_iterations,
            "client built"
        );

        Ok(LlmClient::from_context(PipelineContext {
            provider,
            registry,
            history: self
                .history
                .unwrap_or_else(|| Arc::new(InMemoryHistory::new())),
            usage_sink: self.usage_sink,
            retry,
            config: self.config,
            model,
            params: self.params,
            provider_options: self.provider_options,
            span,
        }))
    }
}

impl std::fmt::Debug for LlmClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClientBuilder")
            .field("provider", &self.provider.as_ref().map(|p| p.provider_id().to_string()))
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
