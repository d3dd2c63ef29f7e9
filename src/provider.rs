//! Provider collaborator
//!
//! The transport-level call is supplied by the application. This crate only
//! orchestrates around it.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::streaming::VendorEventStream;
use crate::types::{ChatRequest, ChatResponse};

/// A single provider round-trip.
#[async_trait]
pub trait ProviderCall: Send + Sync {
    /// Provider id used to match per-request provider options, e.g. `"openai"`.
    fn provider_id(&self) -> &str;

    /// Non-streaming round-trip.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Start a streaming round-trip. Errors returned here happen before any
    /// event is delivered and are eligible for retry.
    async fn stream(&self, request: &ChatRequest) -> Result<VendorEventStream, LlmError>;
}
