//! llm-orchestra
//!
//! Orchestration core for unified LLM clients: normalizes vendor event streams,
//! accumulates streamed tool calls, runs a bounded tool-execution loop and
//! retries provider round-trips with exponential backoff.
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod provider;
pub mod retry;
pub mod streaming;
pub mod tools;
pub mod types;
pub mod usage;
pub mod utils;

pub use client::{LlmClient, LlmClientBuilder};
pub use error::LlmError;

/// Commonly used types.
pub mod prelude {
    pub use crate::client::{LlmClient, LlmClientBuilder};
    pub use crate::config::{PipelineConfig, RetryConfig};
    pub use crate::error::{ErrorCategory, LlmError};
    pub use crate::history::{HistoryStore, InMemoryHistory};
    pub use crate::provider::ProviderCall;
    pub use crate::retry::{RetryExecutor, RetryPolicy};
    pub use crate::streaming::{
        EventFormat, StreamEventTranslator, ToolCallAccumulator, VendorEvent, VendorEventStream,
        decode_sse_stream,
    };
    pub use crate::tools::{
        ToolDefinition, ToolExecutionResult, ToolExecutor, ToolOrchestrator, ToolOutcome,
        ToolRegistry,
    };
    pub use crate::types::{
        ChatMessage, ChatRequest, ChatResponse, ChunkStream, FinishReason, MessageRole,
        NormalizedChunk, ParameterSchema, ProviderOptions, ToolArguments, ToolCall,
        ToolCallFragment, ToolSpec, Usage,
    };
    pub use crate::usage::{UsageSink, UsageTracker};
    pub use crate::utils::CancelHandle;
}
