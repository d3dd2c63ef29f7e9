//! Streaming pipeline
//!
//! Retry wraps stream initiation, which lasts until the first chunk is
//! translated. After that any failure ends the round with an `Error` terminal
//! chunk so delivered content is never replayed.

use futures::Stream;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::Span;

use super::PipelineContext;
use crate::error::LlmError;
use crate::history::{HistoryStore, InMemoryHistory};
use crate::streaming::{StreamEventTranslator, ToolCallAccumulator, VendorEvent, VendorEventStream};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, ChunkStream, FinishReason, NormalizedChunk,
};

/// Per-round translation and accumulation state.
struct RoundState {
    translator: StreamEventTranslator,
    accumulator: ToolCallAccumulator,
    text: String,
}

impl RoundState {
    fn new(span: &Span) -> Self {
        Self {
            translator: StreamEventTranslator::new().with_span(span.clone()),
            accumulator: ToolCallAccumulator::new(),
            text: String::new(),
        }
    }

    fn on_event(&mut self, event: VendorEvent) -> Option<NormalizedChunk> {
        let mut chunk = self.translator.translate(event)?;
        for fragment in &mut chunk.tool_call_fragments {
            self.accumulator.on_fragment(fragment);
        }
        self.text.push_str(&chunk.text_delta);
        if chunk.is_final {
            chunk.tool_calls = self.accumulator.finalize();
        }
        Some(chunk)
    }

    fn response(&self, terminal: &NormalizedChunk) -> ChatResponse {
        ChatResponse {
            text: self.text.clone(),
            tool_calls: terminal.tool_calls.clone(),
            finish_reason: terminal.finish_reason,
            usage: terminal.usage_delta,
            ..Default::default()
        }
    }
}

enum RoundItem {
    Chunk(NormalizedChunk),
    Finished {
        terminal: NormalizedChunk,
        response: ChatResponse,
    },
    /// The round could not be started
    Failed(LlmError),
}

/// A round whose stream is open and has produced its first chunk.
struct OpenedRound {
    events: VendorEventStream,
    state: RoundState,
    first: Option<NormalizedChunk>,
}

/// Open the stream and read until the first translated chunk. A failure in
/// here happens before anything reaches the caller, so it is retried like a
/// failure to open the stream.
async fn open_round(ctx: &PipelineContext, request: &ChatRequest) -> Result<OpenedRound, LlmError> {
    let mut events = ctx.provider.stream(request).await?;
    let mut state = RoundState::new(&ctx.span);
    while let Some(item) = events.next().await {
        if let Some(chunk) = state.on_event(item?) {
            return Ok(OpenedRound {
                events,
                state,
                first: Some(chunk),
            });
        }
    }
    Ok(OpenedRound {
        events,
        state,
        first: None,
    })
}

/// One provider round: open the stream (with retries), translate events
/// until the first terminal, then stop reading.
fn run_round(ctx: Arc<PipelineContext>, request: ChatRequest) -> impl Stream<Item = RoundItem> + Send {
    async_stream::stream! {
        let OpenedRound { mut events, mut state, first } =
            match ctx.retry.execute(|| open_round(&ctx, &request)).await {
                Ok(opened) => opened,
                Err(error) => {
                    yield RoundItem::Failed(error);
                    return;
                }
            };

        let mut pending = first;
        let mut terminal = None;
        loop {
            let chunk = match pending.take() {
                Some(chunk) => chunk,
                None => match events.next().await {
                    Some(Ok(event)) => {
                        let Some(chunk) = state.on_event(event) else { continue };
                        chunk
                    }
                    Some(Err(error)) => {
                        tracing::warn!(parent: &ctx.span, error = %error, "stream failed mid-flight");
                        terminal = Some(NormalizedChunk::error(error.to_string()));
                        break;
                    }
                    None => break,
                },
            };
            if chunk.is_final {
                terminal = Some(chunk);
                break;
            }
            yield RoundItem::Chunk(chunk);
        }
        drop(events);

        let terminal = terminal.unwrap_or_else(|| {
            tracing::warn!(parent: &ctx.span, "stream ended without a terminal event");
            NormalizedChunk::error("stream ended without a terminal event")
        });
        if let Some(usage) = &terminal.usage_delta {
            ctx.record_usage(usage);
        }
        let response = state.response(&terminal);
        yield RoundItem::Finished { terminal, response };
    }
}

/// Streaming turns over a provider's vendor event stream.
#[derive(Debug, Clone)]
pub struct StreamingPipeline {
    ctx: Arc<PipelineContext>,
}

impl StreamingPipeline {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    /// Stream a single round for `messages`.
    ///
    /// History is neither read nor written and tools are not executed; the
    /// terminal chunk carries any finalized tool calls. An initiation failure
    /// (after retries) is yielded as one `Err` item.
    pub fn stream(&self, messages: Vec<ChatMessage>) -> ChunkStream {
        let ctx = self.ctx.clone();
        let s = async_stream::stream! {
            let request = ctx.prepare_request(messages);
            let mut round = Box::pin(run_round(ctx.clone(), request));
            while let Some(item) = round.next().await {
                match item {
                    RoundItem::Chunk(chunk) => yield Ok(chunk),
                    RoundItem::Finished { terminal, .. } => yield Ok(terminal),
                    RoundItem::Failed(error) => yield Err(error),
                }
            }
        };
        Box::pin(s)
    }

    /// Stream one user turn, running the tool loop between rounds.
    ///
    /// Rounds that end in tool calls deliver their terminal chunk with
    /// `is_final = false`; only the last round's terminal is final. Exceeding
    /// the iteration limit yields `ToolIterationLimit` as an `Err` item and
    /// ends the stream. The turn's messages reach history only once the final
    /// terminal is delivered; an `Err` item, an `Error` terminal or dropping
    /// the stream leaves history unchanged.
    pub fn stream_with_tools(&self, message: ChatMessage) -> ChunkStream {
        let ctx = self.ctx.clone();
        let s = async_stream::stream! {
            let turn = InMemoryHistory::with_messages(vec![message]);
            let mut orchestrator = ctx.orchestrator();
            orchestrator.reset_iteration_count();

            loop {
                let request = ctx.turn_request(&turn);
                let mut round = Box::pin(run_round(ctx.clone(), request));
                let mut finished = None;
                while let Some(item) = round.next().await {
                    match item {
                        RoundItem::Chunk(chunk) => yield Ok(chunk),
                        RoundItem::Finished { terminal, response } => {
                            finished = Some((terminal, response));
                        }
                        RoundItem::Failed(error) => {
                            yield Err(error);
                            return;
                        }
                    }
                }
                let Some((mut terminal, response)) = finished else { return };

                if terminal.finish_reason == FinishReason::Error {
                    yield Ok(terminal);
                    return;
                }

                match orchestrator.process(&response, &turn).await {
                    Ok(outcome) if outcome.requires_resubmission => {
                        terminal.is_final = false;
                        terminal.finish_reason = FinishReason::ToolCalls;
                        yield Ok(terminal);
                    }
                    Ok(_) => {
                        turn.append(vec![ChatMessage::assistant(response.text)]);
                        ctx.commit_turn(&turn);
                        yield Ok(terminal);
                        return;
                    }
                    Err(error) => {
                        yield Err(error);
                        return;
                    }
                }
            }
        };
        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::EventFormat;
    use crate::types::Usage;

    fn feed(round: &mut RoundState, data: &str) -> Option<NormalizedChunk> {
        round.on_event(EventFormat::OpenAiResponses.decode(data).unwrap().unwrap())
    }

    #[test]
    fn round_state_builds_response_from_chunks() {
        let mut round = RoundState::new(&Span::none());
        feed(&mut round, r#"{"type":"response.output_text.delta","delta":"Hel"}"#);
        feed(&mut round, r#"{"type":"response.output_text.delta","delta":"lo"}"#);
        let terminal = feed(
            &mut round,
            r#"{"type":"response.completed","response":{"usage":{"input_tokens":2,"output_tokens":1}}}"#,
        )
        .unwrap();
        let response = round.response(&terminal);
        assert_eq!(response.text, "Hello");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage, Some(Usage::new(2, 1)));
        assert!(response.tool_calls.is_empty());
    }
}
