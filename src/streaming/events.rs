//! Vendor stream events
//!
//! Closed enums for the two supported event families. Event types this crate
//! does not know decode to `Unknown` so new vendor events never break a stream.

use serde::Deserialize;
use serde_json::Value;

use crate::error::LlmError;

/// Error payload shared by both families
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VendorErrorBody {
    pub message: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl VendorErrorBody {
    pub fn describe(&self) -> String {
        let code = self.code.as_deref().or(self.kind.as_deref());
        match (self.message.as_deref(), code) {
            (Some(message), Some(code)) => format!("{code}: {message}"),
            (Some(message), None) => message.to_string(),
            (None, Some(code)) => code.to_string(),
            (None, None) => "unknown provider error".to_string(),
        }
    }
}

// -------------------------------------------------------------------------
// OpenAI Responses
// -------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResponsesUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IncompleteDetails {
    pub reason: Option<String>,
}

/// The `response` object carried by lifecycle events
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResponsesEnvelope {
    pub id: Option<String>,
    pub model: Option<String>,
    pub usage: Option<ResponsesUsage>,
    pub incomplete_details: Option<IncompleteDetails>,
    pub error: Option<VendorErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ResponsesOutputItem {
    #[serde(rename = "function_call")]
    FunctionCall {
        id: String,
        #[serde(default)]
        call_id: Option<String>,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        id: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum OpenAiResponsesEvent {
    #[serde(rename = "response.created")]
    Created {
        #[serde(default)]
        response: ResponsesEnvelope,
    },
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        delta: String,
        #[serde(default)]
        item_id: Option<String>,
    },
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        #[serde(default)]
        output_index: Option<u64>,
        item: ResponsesOutputItem,
    },
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta { item_id: String, delta: String },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        item_id: String,
        #[serde(default)]
        arguments: Option<String>,
    },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: ResponsesOutputItem },
    #[serde(rename = "response.completed")]
    Completed {
        #[serde(default)]
        response: ResponsesEnvelope,
    },
    #[serde(rename = "response.incomplete")]
    Incomplete {
        #[serde(default)]
        response: ResponsesEnvelope,
    },
    #[serde(rename = "response.failed")]
    Failed {
        #[serde(default)]
        response: ResponsesEnvelope,
    },
    #[serde(rename = "error", alias = "response.error")]
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        error: Option<VendorErrorBody>,
    },
    #[serde(other)]
    Unknown,
}

// -------------------------------------------------------------------------
// Anthropic Messages
// -------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnthropicUsage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnthropicMessageStart {
    pub id: Option<String>,
    pub model: Option<String>,
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnthropicMessageDelta {
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicMessagesEvent {
    MessageStart {
        #[serde(default)]
        message: AnthropicMessageStart,
    },
    ContentBlockStart {
        index: u32,
        content_block: AnthropicContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: AnthropicDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        #[serde(default)]
        delta: AnthropicMessageDelta,
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    MessageStop,
    Ping,
    Error {
        #[serde(default)]
        error: VendorErrorBody,
    },
    #[serde(other)]
    Unknown,
}

// -------------------------------------------------------------------------
// Family dispatch
// -------------------------------------------------------------------------

/// One decoded vendor event
#[derive(Debug, Clone, PartialEq)]
pub enum VendorEvent {
    OpenAiResponses(OpenAiResponsesEvent),
    AnthropicMessages(AnthropicMessagesEvent),
}

impl From<OpenAiResponsesEvent> for VendorEvent {
    fn from(event: OpenAiResponsesEvent) -> Self {
        Self::OpenAiResponses(event)
    }
}

impl From<AnthropicMessagesEvent> for VendorEvent {
    fn from(event: AnthropicMessagesEvent) -> Self {
        Self::AnthropicMessages(event)
    }
}

/// Wire family of a provider's event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    OpenAiResponses,
    AnthropicMessages,
}

impl EventFormat {
    /// Decode one SSE `data` payload. Empty payloads and `[DONE]` yield `None`.
    pub fn decode(&self, data: &str) -> Result<Option<VendorEvent>, LlmError> {
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(None);
        }
        let parse_err = |e: serde_json::Error| {
            LlmError::ParseError(format!("Failed to parse SSE JSON: {e}"))
        };
        let event = match self {
            Self::OpenAiResponses => {
                VendorEvent::OpenAiResponses(serde_json::from_str(data).map_err(parse_err)?)
            }
            Self::AnthropicMessages => {
                VendorEvent::AnthropicMessages(serde_json::from_str(data).map_err(parse_err)?)
            }
        };
        Ok(Some(event))
    }
}
