//! Tool execution
//!
//! Resolves a call against the registry, validates its arguments and runs it.
//! Failures are captured per call so one bad call never blocks its siblings.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::Span;

use super::registry::ToolRegistry;
use crate::error::LlmError;
use crate::types::{ChatMessage, RawArguments, ToolArguments, ToolCall};

/// Exactly one of success or failure.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    Success(Value),
    Failure(LlmError),
}

/// Outcome of running one tool call.
#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub arguments: ToolArguments,
    pub outcome: ToolOutcome,
}

impl ToolExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    /// Conversation message reporting this result.
    ///
    /// Successes become `function` messages named after the tool; failures
    /// become `system` messages naming the tool and the error.
    pub fn to_message(&self) -> ChatMessage {
        match &self.outcome {
            ToolOutcome::Success(value) => {
                let content = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                ChatMessage::function(&self.tool_name, &self.tool_call_id, content)
            }
            ToolOutcome::Failure(error) => ChatMessage::system(format!(
                "Error executing tool '{}': {error}",
                self.tool_name
            ))
            .with_name(&self.tool_name)
            .with_tool_call_id(&self.tool_call_id),
        }
    }
}

/// Runs tool calls against a shared registry.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    span: Span,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            span: tracing::debug_span!("tool_executor"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute one call.
    ///
    /// Returns `ToolNotFound` for an unregistered name and `ToolExecution` for
    /// invalid arguments or a failing tool.
    pub async fn execute(&self, call: &ToolCall) -> Result<Value, LlmError> {
        let tool = self
            .registry
            .resolve(&call.name)
            .ok_or_else(|| LlmError::ToolNotFound {
                name: call.name.clone(),
            })?;

        let arguments = match &call.arguments {
            ToolArguments::Parsed(map) => map.clone(),
            ToolArguments::Raw(RawArguments { raw_arguments }) => {
                return Err(LlmError::tool_execution(
                    &call.name,
                    format!("arguments are not a JSON object: {raw_arguments}"),
                ));
            }
        };

        tool.spec
            .parameters
            .validate_arguments(&arguments)
            .map_err(|message| LlmError::tool_execution(&call.name, message))?;

        tool.function
            .call(arguments)
            .await
            .map_err(|error| match error {
                LlmError::ToolExecution { .. } => error,
                other => LlmError::tool_execution(&call.name, other.to_string()),
            })
    }

    /// Execute one call and capture the outcome.
    pub async fn run(&self, call: &ToolCall) -> ToolExecutionResult {
        let outcome = match self.execute(call).await {
            Ok(value) => {
                tracing::debug!(parent: &self.span, tool = %call.name, id = %call.id, "tool call succeeded");
                ToolOutcome::Success(value)
            }
            Err(error) => {
                tracing::warn!(parent: &self.span, tool = %call.name, id = %call.id, error = %error, "tool call failed");
                ToolOutcome::Failure(error)
            }
        };
        ToolExecutionResult {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            outcome,
        }
    }

    /// Run every call, concurrently when `concurrent` is set. Results are in
    /// input order either way.
    pub async fn execute_batch(
        &self,
        calls: &[ToolCall],
        concurrent: bool,
    ) -> Vec<ToolExecutionResult> {
        if concurrent {
            join_all(calls.iter().map(|call| self.run(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.run(call).await);
            }
            results
        }
    }
}
