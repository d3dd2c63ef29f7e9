//! SSE decoding
//!
//! Helpers for provider collaborators that hold a raw SSE byte stream: parse
//! `data:` payloads into typed vendor events.

use eventsource_stream::Eventsource;
use futures_util::Stream;
use futures_util::StreamExt;

use super::VendorEventStream;
use super::events::EventFormat;
use crate::error::LlmError;

/// Convert a bytes stream of SSE frames into a vendor event stream.
///
/// Empty payloads and `[DONE]` are skipped. A transport or parse failure is
/// yielded once and ends the stream.
pub fn decode_sse_stream<S, B>(byte_stream: S, format: EventFormat) -> VendorEventStream
where
    S: Stream<Item = Result<B, LlmError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut sse_stream = Box::pin(byte_stream.eventsource());

        while let Some(item) = sse_stream.next().await {
            let event = match item {
                Ok(ev) => ev,
                Err(e) => {
                    yield Err(LlmError::StreamError(format!("SSE stream error: {e}")));
                    return;
                }
            };

            match format.decode(&event.data) {
                Ok(Some(vendor_event)) => yield Ok(vendor_event),
                Ok(None) => continue,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    };

    Box::pin(out)
}
