//! Entry / Batch - submitted items and the groups cut from the live queue

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use contracts::FlushReason;
use tokio::sync::oneshot;

use crate::error::FlushError;

/// Outcome delivered to one submitter
pub type Response<R> = Result<R, FlushError>;

/// Write side of an entry's one-shot signal
///
/// Consumed by `respond`, so at most one response is ever written.
pub(crate) struct Responder<R> {
    tx: oneshot::Sender<Response<R>>,
}

impl<R> Responder<R> {
    /// Deliver the response; false if the submitter stopped listening
    pub(crate) fn respond(self, response: Response<R>) -> bool {
        self.tx.send(response).is_ok()
    }
}

/// One submitted item plus its private response signal
pub(crate) struct Entry<I, R> {
    pub(crate) item: I,
    pub(crate) weight: usize,
    responder: Responder<R>,
}

impl<I, R> Entry<I, R> {
    /// Create an entry and the signal its submitter waits on
    pub(crate) fn new(item: I, weight: usize) -> (Self, ResponseSignal<R>) {
        let (tx, rx) = oneshot::channel();
        let entry = Self {
            item,
            weight,
            responder: Responder { tx },
        };
        (entry, ResponseSignal { rx })
    }
}

/// Entries cut atomically from the live queue, in arrival order
pub(crate) struct Batch<I, R> {
    pub(crate) seq: u64,
    pub(crate) reason: FlushReason,
    pub(crate) weight: usize,
    entries: Vec<Entry<I, R>>,
}

impl<I, R> Batch<I, R> {
    pub(crate) fn new(
        seq: u64,
        reason: FlushReason,
        weight: usize,
        entries: Vec<Entry<I, R>>,
    ) -> Self {
        Self {
            seq,
            reason,
            weight,
            entries,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Split into the items handed to the processor and the matching responders
    pub(crate) fn into_parts(self) -> (Vec<I>, Vec<Responder<R>>) {
        self.entries
            .into_iter()
            .map(|entry| (entry.item, entry.responder))
            .unzip()
    }
}

/// Read side of an entry's response signal
///
/// Await it for the response. If the buffer is torn down before the entry
/// is answered, it resolves to [`FlushError::Abandoned`].
#[must_use = "the response is only observable through the signal"]
pub struct ResponseSignal<R> {
    rx: oneshot::Receiver<Response<R>>,
}

impl<R> ResponseSignal<R> {
    /// Wait for the response from synchronous code
    ///
    /// # Panics
    /// Panics if called from within an async execution context.
    pub fn blocking_wait(self) -> Response<R> {
        self.rx.blocking_recv().unwrap_or(Err(FlushError::Abandoned))
    }

    /// Take the response if it has already been delivered
    pub fn try_take(&mut self) -> Option<Response<R>> {
        match self.rx.try_recv() {
            Ok(response) => Some(response),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(FlushError::Abandoned)),
        }
    }
}

impl<R> std::fmt::Debug for ResponseSignal<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSignal").finish_non_exhaustive()
    }
}

impl<R> Future for ResponseSignal<R> {
    type Output = Response<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(FlushError::Abandoned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entry_signal_receives_response() {
        let (entry, signal) = Entry::<&str, u32>::new("a", 3);
        assert_eq!(entry.weight, 3);
        assert!(entry.responder.respond(Ok(7)));
        assert_eq!(signal.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_dropped_entry_abandons_signal() {
        let (entry, signal) = Entry::<&str, u32>::new("a", 1);
        drop(entry);
        assert!(matches!(signal.await, Err(FlushError::Abandoned)));
    }

    #[test]
    fn test_try_take() {
        let (entry, mut signal) = Entry::<&str, u32>::new("a", 1);
        assert!(signal.try_take().is_none());
        entry.responder.respond(Ok(1));
        assert_eq!(signal.try_take().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_signal_debug_needs_no_debug_result() {
        struct Opaque;
        let (_entry, signal) = Entry::<&str, Opaque>::new("a", 1);
        assert_eq!(format!("{signal:?}"), "ResponseSignal { .. }");
    }

    #[test]
    fn test_respond_after_signal_dropped() {
        let (entry, signal) = Entry::<&str, u32>::new("a", 1);
        drop(signal);
        assert!(!entry.responder.respond(Ok(1)));
    }

    #[test]
    fn test_batch_into_parts_keeps_order() {
        let entries: Vec<_> = ["x", "y", "z"]
            .into_iter()
            .map(|item| Entry::<&str, u32>::new(item, 1).0)
            .collect();
        let batch = Batch::new(1, FlushReason::Capacity, 3, entries);
        assert_eq!(batch.len(), 3);
        let (items, responders) = batch.into_parts();
        assert_eq!(items, vec!["x", "y", "z"]);
        assert_eq!(responders.len(), 3);
    }
}
