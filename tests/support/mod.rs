//! Shared test fixtures: a scripted provider and event helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use llm_orchestra::prelude::*;
use llm_orchestra::tools::ToolDefinition;
use serde_json::{Value, json};

/// One scripted answer to `ProviderCall::stream`.
pub enum StreamScript {
    /// Fail before any event is delivered
    Fail(LlmError),
    /// Deliver these items in order
    Events(Vec<Result<VendorEvent, LlmError>>),
    /// Deliver raw SSE frames decoded with the given format
    Sse(EventFormat, Vec<&'static str>),
}

/// Provider whose answers are queued up front. Every request is recorded.
pub struct ScriptedProvider {
    id: String,
    chat_script: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
    stream_script: Mutex<VecDeque<StreamScript>>,
    requests: Mutex<Vec<ChatRequest>>,
    chat_calls: AtomicU32,
    stream_calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            chat_script: Mutex::new(VecDeque::new()),
            stream_script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            chat_calls: AtomicU32::new(0),
            stream_calls: AtomicU32::new(0),
        }
    }

    pub fn openai() -> Self {
        Self::new("openai")
    }

    pub fn push_chat(self, response: Result<ChatResponse, LlmError>) -> Self {
        self.chat_script.lock().unwrap().push_back(response);
        self
    }

    pub fn push_stream(self, script: StreamScript) -> Self {
        self.stream_script.lock().unwrap().push_back(script);
        self
    }

    pub fn chat_calls(&self) -> u32 {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderCall for ScriptedProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.chat_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InternalError("chat script exhausted".into())))
    }

    async fn stream(&self, request: &ChatRequest) -> Result<VendorEventStream, LlmError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .stream_script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::InternalError("stream script exhausted".into()))?;
        match script {
            StreamScript::Fail(error) => Err(error),
            StreamScript::Events(items) => Ok(Box::pin(futures_util::stream::iter(items))),
            StreamScript::Sse(format, frames) => {
                let bytes = futures_util::stream::iter(
                    frames
                        .into_iter()
                        .map(|f| Ok::<_, LlmError>(f.as_bytes().to_vec()))
                        .collect::<Vec<_>>(),
                );
                Ok(decode_sse_stream(bytes, format))
            }
        }
    }
}

// -------------------------------------------------------------------------
// OpenAI Responses event builders
// -------------------------------------------------------------------------

fn responses(value: Value) -> Result<VendorEvent, LlmError> {
    Ok(EventFormat::OpenAiResponses
        .decode(&value.to_string())
        .expect("valid event")
        .expect("not a done marker"))
}

pub fn text(delta: &str) -> Result<VendorEvent, LlmError> {
    responses(json!({"type": "response.output_text.delta", "delta": delta}))
}

pub fn tool_added(id: &str, name: &str) -> Result<VendorEvent, LlmError> {
    responses(json!({
        "type": "response.output_item.added",
        "item": {"type": "function_call", "id": id, "name": name, "arguments": ""}
    }))
}

pub fn args(id: &str, delta: &str) -> Result<VendorEvent, LlmError> {
    responses(json!({
        "type": "response.function_call_arguments.delta",
        "item_id": id,
        "delta": delta
    }))
}

pub fn completed() -> Result<VendorEvent, LlmError> {
    responses(json!({"type": "response.completed", "response": {"id": "resp_1"}}))
}

pub fn completed_with_usage(input: u32, output: u32) -> Result<VendorEvent, LlmError> {
    responses(json!({
        "type": "response.completed",
        "response": {"usage": {"input_tokens": input, "output_tokens": output}}
    }))
}

/// A full round that requests one tool call.
pub fn tool_round(id: &str, name: &str, arguments: &str) -> StreamScript {
    StreamScript::Events(vec![
        tool_added(id, name),
        args(id, arguments),
        completed(),
    ])
}

/// A full round that answers with text.
pub fn text_round(answer: &str) -> StreamScript {
    StreamScript::Events(vec![text(answer), completed()])
}

// -------------------------------------------------------------------------
// Client helpers
// -------------------------------------------------------------------------

/// Two retries (three attempts) with millisecond delays.
pub fn fast_config() -> PipelineConfig {
    PipelineConfig::new().with_retry(
        RetryConfig::default()
            .with_max_retries(2)
            .with_base_delay_ms(1)
            .with_max_delay_ms(4),
    )
}

pub fn weather_tool() -> ToolDefinition {
    ToolDefinition::from_fn(
        "weather",
        "Current weather for a city",
        ParameterSchema::object()
            .property("city", ParameterSchema::string(), true)
            .deny_additional_properties(),
        |args| async move { Ok(json!({"city": args["city"], "temp_c": 21})) },
    )
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, ToolArguments::from(arguments))
}

pub async fn collect(stream: ChunkStream) -> Vec<Result<NormalizedChunk, LlmError>> {
    stream.collect().await
}

pub fn ok_chunks(items: Vec<Result<NormalizedChunk, LlmError>>) -> Vec<NormalizedChunk> {
    items
        .into_iter()
        .map(|item| item.expect("chunk should be Ok"))
        .collect()
}
