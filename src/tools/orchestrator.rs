//! Bounded tool loop
//!
//! Detects tool calls in a response, runs them, records the exchange in the
//! conversation history and tells the pipeline whether to resubmit. The
//! number of tool-bearing responses per user turn is capped.

use std::collections::HashSet;
use tracing::Span;
use uuid::Uuid;

use super::executor::{ToolExecutionResult, ToolExecutor};
use crate::error::LlmError;
use crate::history::HistoryStore;
use crate::types::{ChatMessage, ChatResponse, ToolCall};

/// Loop state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestrationPhase {
    #[default]
    Idle,
    Detecting,
    Executing,
    Resubmitting,
    Done,
    LimitExceeded,
}

/// Per-turn loop counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestrationState {
    pub iteration_count: u32,
    pub max_iterations: u32,
    pub phase: OrchestrationPhase,
}

/// What the pipeline should do after a response was processed.
#[derive(Debug, Clone, Default)]
pub struct OrchestrationOutcome {
    pub requires_resubmission: bool,
    pub results: Vec<ToolExecutionResult>,
}

/// Drives tool execution for one user turn.
#[derive(Debug)]
pub struct ToolOrchestrator {
    executor: ToolExecutor,
    state: OrchestrationState,
    parallel_tool_calls: bool,
    span: Span,
}

impl ToolOrchestrator {
    pub fn new(executor: ToolExecutor, max_iterations: u32) -> Self {
        Self {
            executor,
            state: OrchestrationState {
                iteration_count: 0,
                max_iterations,
                phase: OrchestrationPhase::Idle,
            },
            parallel_tool_calls: true,
            span: tracing::debug_span!("tool_orchestrator"),
        }
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> OrchestrationState {
        self.state
    }

    pub fn iteration_count(&self) -> u32 {
        self.state.iteration_count
    }

    /// Start a new user turn.
    pub fn reset_iteration_count(&mut self) {
        self.state.iteration_count = 0;
        self.state.phase = OrchestrationPhase::Idle;
    }

    /// Process one assistant response.
    ///
    /// Without tool calls the turn is done and nothing is written. With tool
    /// calls, every call is executed and the assistant request plus one result
    /// message per call are appended to `history` in call order. Fails with
    /// `ToolIterationLimit` when the turn has used all its iterations.
    pub async fn process(
        &mut self,
        response: &ChatResponse,
        history: &dyn HistoryStore,
    ) -> Result<OrchestrationOutcome, LlmError> {
        self.state.phase = OrchestrationPhase::Detecting;

        if !response.has_tool_calls() {
            self.state.phase = OrchestrationPhase::Done;
            return Ok(OrchestrationOutcome::default());
        }

        if self.state.iteration_count >= self.state.max_iterations {
            self.state.phase = OrchestrationPhase::LimitExceeded;
            tracing::warn!(
                parent: &self.span,
                iterations = self.state.iteration_count,
                max_iterations = self.state.max_iterations,
                "tool iteration limit reached"
            );
            return Err(LlmError::ToolIterationLimit {
                iterations: self.state.iteration_count,
                max_iterations: self.state.max_iterations,
            });
        }

        self.state.iteration_count += 1;
        self.state.phase = OrchestrationPhase::Executing;

        let calls = self.normalize_calls(&response.tool_calls);
        tracing::debug!(
            parent: &self.span,
            iteration = self.state.iteration_count,
            calls = calls.len(),
            "executing tool calls"
        );
        let results = self
            .executor
            .execute_batch(&calls, self.parallel_tool_calls)
            .await;

        let mut messages = Vec::with_capacity(results.len() + 1);
        messages.push(ChatMessage::assistant_with_tool_calls(
            response.text.clone(),
            calls,
        ));
        messages.extend(results.iter().map(ToolExecutionResult::to_message));
        history.append(messages);

        self.state.phase = OrchestrationPhase::Resubmitting;
        Ok(OrchestrationOutcome {
            requires_resubmission: true,
            results,
        })
    }

    /// Give id-less calls a generated id and drop repeated ids so every call
    /// gets exactly one result message.
    fn normalize_calls(&self, calls: &[ToolCall]) -> Vec<ToolCall> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(calls.len());
        for call in calls {
            let mut call = call.clone();
            if call.id.is_empty() {
                call.id = format!("call_{}", Uuid::new_v4());
            }
            if !seen.insert(call.id.clone()) {
                tracing::warn!(parent: &self.span, id = %call.id, tool = %call.name, "dropping duplicate tool call id");
                continue;
            }
            out.push(call);
        }
        out
    }
}
