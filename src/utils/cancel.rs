//! Cancellation utilities
//!
//! First-class cancellation handles for chunk streams.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::types::ChunkStream;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The wrapped stream ends at its next poll and
    /// drops the provider stream, along with any per-call tool loop state.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Make a chunk stream cancellable and return its cancel handle.
pub fn make_cancellable_stream(stream: ChunkStream) -> (ChunkStream, CancelHandle) {
    let handle = CancelHandle::new();
    let token = handle.token.clone();
    let mut inner = stream;
    let s = async_stream::stream! {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
    };
    (Box::pin(s), handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NormalizedChunk;

    #[tokio::test]
    async fn cancel_wakes_pending_next_immediately() {
        let pending: ChunkStream = Box::pin(futures_util::stream::pending());
        let (mut s, cancel) = make_cancellable_stream(pending);

        let waiter = tokio::spawn(async move { s.next().await });
        tokio::task::yield_now().await;
        cancel.cancel();

        let out = tokio::time::timeout(std::time::Duration::from_millis(200), waiter)
            .await
            .expect("cancel should wake the waiting task")
            .expect("task ok");
        assert!(out.is_none());
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn passes_items_through_until_cancelled() {
        let inner: ChunkStream = Box::pin(futures_util::stream::iter(vec![
            Ok(NormalizedChunk::text("a")),
            Ok(NormalizedChunk::text("b")),
        ]));
        let (mut s, cancel) = make_cancellable_stream(inner);
        assert_eq!(s.next().await.unwrap().unwrap().text_delta, "a");
        cancel.cancel();
        assert!(s.next().await.is_none());
    }
}
