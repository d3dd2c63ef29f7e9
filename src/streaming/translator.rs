//! Stream event translation
//!
//! Turns vendor events into normalized chunks, one event at a time. The
//! translator tracks which tool calls were announced so argument deltas for
//! unknown ids can be dropped, and decides the finish reason of the round.

use std::collections::{HashMap, HashSet};
use tracing::Span;

use super::events::{
    AnthropicContentBlock, AnthropicDelta, AnthropicMessagesEvent, AnthropicUsage,
    OpenAiResponsesEvent, ResponsesEnvelope, ResponsesOutputItem, VendorEvent,
};
use crate::types::{FinishReason, NormalizedChunk, ToolCallFragment, Usage};

/// Per-stream translation state. Create one per provider round.
#[derive(Debug)]
pub struct StreamEventTranslator {
    known_ids: HashSet<String>,
    /// Anthropic content block index -> tool_use id
    block_ids: HashMap<u32, String>,
    saw_tool_call: bool,
    stop_reason: Option<FinishReason>,
    usage: Option<Usage>,
    finished: bool,
    span: Span,
}

impl Default for StreamEventTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamEventTranslator {
    pub fn new() -> Self {
        Self {
            known_ids: HashSet::new(),
            block_ids: HashMap::new(),
            saw_tool_call: false,
            stop_reason: None,
            usage: None,
            finished: false,
            span: tracing::debug_span!("stream_translator"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Whether a terminal event has been translated.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Translate one vendor event into zero or one normalized chunk.
    pub fn translate(&mut self, event: VendorEvent) -> Option<NormalizedChunk> {
        if self.finished {
            tracing::debug!(parent: &self.span, ?event, "ignoring event after terminal");
            return None;
        }
        let chunk = match event {
            VendorEvent::OpenAiResponses(event) => self.translate_openai_responses(event),
            VendorEvent::AnthropicMessages(event) => self.translate_anthropic_messages(event),
        };
        if chunk.as_ref().is_some_and(|c| c.is_final) {
            self.finished = true;
        }
        chunk
    }

    fn announce(&mut self, provider_id: &str) {
        self.known_ids.insert(provider_id.to_string());
        self.saw_tool_call = true;
    }

    fn arguments_for(&self, provider_id: &str, delta: String) -> Option<NormalizedChunk> {
        if !self.known_ids.contains(provider_id) {
            tracing::warn!(
                parent: &self.span,
                provider_id,
                "dropping argument delta for unknown tool call"
            );
            return None;
        }
        Some(NormalizedChunk::fragment(ToolCallFragment::arguments(
            provider_id,
            delta,
        )))
    }

    fn completion_reason(&self) -> FinishReason {
        if self.saw_tool_call {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        }
    }

    fn translate_openai_responses(&mut self, event: OpenAiResponsesEvent) -> Option<NormalizedChunk> {
        match event {
            OpenAiResponsesEvent::OutputTextDelta { delta, .. } => {
                (!delta.is_empty()).then(|| NormalizedChunk::text(delta))
            }
            OpenAiResponsesEvent::OutputItemAdded {
                item:
                    ResponsesOutputItem::FunctionCall {
                        id,
                        call_id,
                        name,
                        arguments,
                    },
                ..
            } => {
                self.announce(&id);
                let mut fragment = ToolCallFragment::started(id, call_id, name);
                if !arguments.is_empty() {
                    fragment.arguments_chunk = Some(arguments);
                }
                Some(NormalizedChunk::fragment(fragment))
            }
            OpenAiResponsesEvent::FunctionCallArgumentsDelta { item_id, delta } => {
                self.arguments_for(&item_id, delta)
            }
            OpenAiResponsesEvent::Completed { response } => {
                let reason = self.completion_reason();
                Some(NormalizedChunk::terminal(reason, responses_usage(&response)))
            }
            OpenAiResponsesEvent::Incomplete { response } => {
                let reason = match response
                    .incomplete_details
                    .as_ref()
                    .and_then(|d| d.reason.as_deref())
                {
                    Some("content_filter") => FinishReason::ContentFilter,
                    _ => FinishReason::Length,
                };
                Some(NormalizedChunk::terminal(reason, responses_usage(&response)))
            }
            OpenAiResponsesEvent::Failed { response } => {
                let message = response
                    .error
                    .as_ref()
                    .map(|e| e.describe())
                    .unwrap_or_else(|| "response failed".to_string());
                let mut chunk = NormalizedChunk::error(message);
                chunk.usage_delta = responses_usage(&response);
                Some(chunk)
            }
            OpenAiResponsesEvent::Error {
                message,
                code,
                error,
            } => {
                let message = match (error, message) {
                    (Some(body), _) => body.describe(),
                    (None, Some(message)) => match code {
                        Some(code) => format!("{code}: {message}"),
                        None => message,
                    },
                    (None, None) => "unknown provider error".to_string(),
                };
                Some(NormalizedChunk::error(message))
            }
            OpenAiResponsesEvent::Created { .. }
            | OpenAiResponsesEvent::OutputItemAdded { .. }
            | OpenAiResponsesEvent::FunctionCallArgumentsDone { .. }
            | OpenAiResponsesEvent::OutputItemDone { .. } => None,
            OpenAiResponsesEvent::Unknown => {
                tracing::debug!(parent: &self.span, "dropping unrecognized responses event");
                None
            }
        }
    }

    fn translate_anthropic_messages(
        &mut self,
        event: AnthropicMessagesEvent,
    ) -> Option<NormalizedChunk> {
        match event {
            AnthropicMessagesEvent::MessageStart { message } => {
                self.merge_anthropic_usage(message.usage.as_ref());
                None
            }
            AnthropicMessagesEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    self.announce(&id);
                    self.block_ids.insert(index, id.clone());
                    let mut fragment = ToolCallFragment::started(id.clone(), Some(id), name);
                    // Streamed tool_use blocks open with `{}`; real arguments follow as deltas.
                    if input.as_object().is_some_and(|o| !o.is_empty()) {
                        fragment.arguments_chunk = Some(input.to_string());
                    }
                    Some(NormalizedChunk::fragment(fragment))
                }
                AnthropicContentBlock::Text { text } => {
                    (!text.is_empty()).then(|| NormalizedChunk::text(text))
                }
                AnthropicContentBlock::Other => None,
            },
            AnthropicMessagesEvent::ContentBlockDelta { index, delta } => match delta {
                AnthropicDelta::TextDelta { text } => {
                    (!text.is_empty()).then(|| NormalizedChunk::text(text))
                }
                AnthropicDelta::InputJsonDelta { partial_json } => {
                    if partial_json.is_empty() {
                        return None;
                    }
                    match self.block_ids.get(&index).cloned() {
                        Some(id) => self.arguments_for(&id, partial_json),
                        None => {
                            tracing::warn!(
                                parent: &self.span,
                                block_index = index,
                                "dropping argument delta for unknown content block"
                            );
                            None
                        }
                    }
                }
                AnthropicDelta::Other => None,
            },
            AnthropicMessagesEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason.as_deref() {
                    self.stop_reason = Some(anthropic_stop_reason(reason));
                }
                self.merge_anthropic_usage(usage.as_ref());
                None
            }
            AnthropicMessagesEvent::MessageStop => {
                let reason = self
                    .stop_reason
                    .unwrap_or_else(|| self.completion_reason());
                Some(NormalizedChunk::terminal(reason, self.usage))
            }
            AnthropicMessagesEvent::Error { error } => {
                Some(NormalizedChunk::error(error.describe()))
            }
            AnthropicMessagesEvent::ContentBlockStop { .. } | AnthropicMessagesEvent::Ping => None,
            AnthropicMessagesEvent::Unknown => {
                tracing::debug!(parent: &self.span, "dropping unrecognized messages event");
                None
            }
        }
    }

    fn merge_anthropic_usage(&mut self, usage: Option<&AnthropicUsage>) {
        let Some(usage) = usage else { return };
        let current = self.usage.get_or_insert_with(Usage::default);
        if let Some(input) = usage.input_tokens {
            current.prompt_tokens = input;
        }
        if let Some(output) = usage.output_tokens {
            current.completion_tokens = output;
        }
        current.total_tokens = current.prompt_tokens.saturating_add(current.completion_tokens);
    }
}

fn responses_usage(response: &ResponsesEnvelope) -> Option<Usage> {
    response.usage.as_ref().map(|u| Usage {
        prompt_tokens: u.input_tokens,
        completion_tokens: u.output_tokens,
        total_tokens: u
            .total_tokens
            .unwrap_or_else(|| u.input_tokens.saturating_add(u.output_tokens)),
    })
}

fn anthropic_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "tool_use" => FinishReason::ToolCalls,
        "max_tokens" => FinishReason::Length,
        "refusal" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}
