//! Streaming
//!
//! Vendor event decoding, translation into normalized chunks and tool-call
//! accumulation.

pub mod accumulator;
pub mod events;
pub mod sse;
pub mod translator;

pub use accumulator::*;
pub use events::*;
pub use sse::decode_sse_stream;
pub use translator::StreamEventTranslator;

use futures::Stream;
use std::pin::Pin;

use crate::error::LlmError;

/// Stream of vendor events produced by a provider collaborator.
pub type VendorEventStream = Pin<Box<dyn Stream<Item = Result<VendorEvent, LlmError>> + Send>>;
