//! Normalized streaming types.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use super::chat::{FinishReason, Usage};
use super::tools::ToolCall;
use crate::error::LlmError;

/// A piece of an in-progress tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Dense index assigned by the accumulator in first-seen order
    pub index: usize,
    /// Vendor identifier used to correlate fragments of one call
    pub provider_id: String,
    /// Vendor tool-call id used when replying with results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments_chunk: Option<String>,
}

impl ToolCallFragment {
    /// Announcement of a new call. The index is stamped later.
    pub fn started(
        provider_id: impl Into<String>,
        call_id: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            index: 0,
            provider_id: provider_id.into(),
            call_id,
            name: Some(name.into()),
            arguments_chunk: None,
        }
    }

    /// An argument delta for a known call.
    pub fn arguments(provider_id: impl Into<String>, chunk: impl Into<String>) -> Self {
        Self {
            index: 0,
            provider_id: provider_id.into(),
            call_id: None,
            name: None,
            arguments_chunk: Some(chunk.into()),
        }
    }
}

/// Provider-agnostic unit of streamed response content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedChunk {
    #[serde(default)]
    pub text_delta: String,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_call_fragments: Vec<ToolCallFragment>,
    #[serde(default)]
    pub finish_reason: FinishReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_delta: Option<Usage>,
    /// Failure text on `Error` terminals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Finalized calls, carried on the terminal chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl NormalizedChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            text_delta: delta.into(),
            ..Default::default()
        }
    }

    pub fn fragment(fragment: ToolCallFragment) -> Self {
        Self {
            tool_call_fragments: vec![fragment],
            ..Default::default()
        }
    }

    /// A terminal chunk with the given finish reason.
    pub fn terminal(finish_reason: FinishReason, usage: Option<Usage>) -> Self {
        Self {
            is_final: true,
            finish_reason,
            usage_delta: usage,
            ..Default::default()
        }
    }

    /// A terminal `Error` chunk carrying the failure text.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_final: true,
            finish_reason: FinishReason::Error,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether this chunk ends a round (final or not).
    pub fn is_terminal(&self) -> bool {
        self.finish_reason != FinishReason::None
    }
}

/// Stream of normalized chunks handed to callers.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<NormalizedChunk, LlmError>> + Send>>;
