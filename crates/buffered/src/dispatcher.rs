//! Dispatcher - single owner of the live queue
//!
//! Accepts entries from the mailbox, evaluates the flush triggers after every
//! insertion and on the period deadline, and hands each cut batch to a flush
//! worker without waiting for it.

use std::sync::Arc;
use std::time::Duration;

use contracts::FlushReason;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, instrument};

use crate::buffer::Lifecycle;
use crate::entry::{Batch, Entry};
use crate::metrics::BufferMetrics;
use crate::worker::{flush_batch, FlushContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatcherState {
    /// Live queue empty
    Idle,
    /// Live queue non-empty since `since`
    Accumulating { since: Instant },
    /// Shutdown requested
    Draining,
}

/// Flush thresholds, copied out of the validated options
#[derive(Debug, Clone, Copy)]
pub(crate) struct Thresholds {
    pub(crate) max_capacity: usize,
    pub(crate) flush_period: Duration,
    pub(crate) max_data_size: usize,
}

pub(crate) struct Dispatcher<I, R> {
    thresholds: Thresholds,
    mailbox: mpsc::Receiver<Entry<I, R>>,
    queue: Vec<Entry<I, R>>,
    weight: usize,
    state: DispatcherState,
    next_seq: u64,
    flush_ctx: FlushContext<I, R>,
    workers: TaskTracker,
    shutdown: CancellationToken,
    lifecycle: Arc<Lifecycle>,
    dispatch: tracing::Dispatch,
}

impl<I, R> Dispatcher<I, R>
where
    I: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        thresholds: Thresholds,
        mailbox: mpsc::Receiver<Entry<I, R>>,
        flush_ctx: FlushContext<I, R>,
        shutdown: CancellationToken,
        lifecycle: Arc<Lifecycle>,
        dispatch: tracing::Dispatch,
    ) -> Self {
        Self {
            thresholds,
            mailbox,
            queue: Vec::with_capacity(thresholds.max_capacity),
            weight: 0,
            state: DispatcherState::Idle,
            next_seq: 0,
            flush_ctx,
            workers: TaskTracker::new(),
            shutdown,
            lifecycle,
            dispatch,
        }
    }

    fn metrics(&self) -> &BufferMetrics {
        &self.flush_ctx.metrics
    }

    /// Run the dispatcher main loop
    ///
    /// Returns after shutdown is requested (or every sender is gone), the
    /// remaining entries are flushed and every flush worker has finished.
    #[instrument(name = "buffer_dispatcher", skip(self), fields(buffer = %self.flush_ctx.label))]
    pub(crate) async fn run(mut self) {
        info!(
            max_capacity = self.thresholds.max_capacity,
            flush_period_ms = u64::try_from(self.thresholds.flush_period.as_millis()).unwrap_or(u64::MAX),
            max_data_size = self.thresholds.max_data_size,
            "Buffer dispatcher started"
        );

        loop {
            // A deadline past the clock's range never fires.
            let deadline = match self.state {
                DispatcherState::Accumulating { since } => {
                    since.checked_add(self.thresholds.flush_period)
                }
                _ => None,
            };

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                received = self.mailbox.recv() => match received {
                    Some(entry) => self.accept(entry),
                    None => break,
                },
                _ = sleep_until(deadline) => self.on_deadline(),
            }
        }

        self.drain().await;
    }

    /// Spawn the dispatcher on the runtime
    pub(crate) fn spawn(self) -> tokio::task::JoinHandle<()> {
        let dispatch = self.dispatch.clone();
        tokio::spawn(self.run().with_subscriber(dispatch))
    }

    fn accept(&mut self, entry: Entry<I, R>) {
        if self.state == DispatcherState::Idle {
            self.state = DispatcherState::Accumulating {
                since: Instant::now(),
            };
        }

        self.weight = self.weight.saturating_add(entry.weight);
        self.queue.push(entry);
        self.publish_queue();

        if self.queue.len() >= self.thresholds.max_capacity {
            self.cut(FlushReason::Capacity);
        } else if self.weight >= self.thresholds.max_data_size {
            self.cut(FlushReason::Size);
        }
    }

    fn on_deadline(&mut self) {
        if let DispatcherState::Accumulating { since } = self.state {
            if since.elapsed() >= self.thresholds.flush_period {
                self.cut(FlushReason::Period);
            }
        }
    }

    /// Move the live queue into a batch and hand it to a new flush worker
    fn cut(&mut self, reason: FlushReason) {
        if self.queue.is_empty() {
            return;
        }

        let entries = std::mem::replace(
            &mut self.queue,
            Vec::with_capacity(self.thresholds.max_capacity),
        );
        let weight = std::mem::take(&mut self.weight);
        if self.state != DispatcherState::Draining {
            self.state = DispatcherState::Idle;
        }
        self.publish_queue();

        self.next_seq += 1;
        let batch = Batch::new(self.next_seq, reason, weight, entries);
        debug!(
            batch = batch.seq,
            reason = %reason,
            items = batch.len(),
            weight,
            "Batch cut"
        );

        let worker = flush_batch(self.flush_ctx.clone(), batch);
        self.workers.spawn(worker.with_subscriber(self.dispatch.clone()));
    }

    fn publish_queue(&self) {
        self.metrics().set_queue(self.queue.len(), self.weight);
        observability::record_queue_depth(&self.flush_ctx.label, self.queue.len(), self.weight);
    }

    /// Stop accepting, flush what is left, wait for every worker
    async fn drain(&mut self) {
        self.state = DispatcherState::Draining;
        self.mailbox.close();

        // Entries already in the mailbox were accepted by submit; flush them too.
        while let Some(entry) = self.mailbox.recv().await {
            self.accept(entry);
        }
        self.cut(FlushReason::Shutdown);

        self.workers.close();
        debug!(in_flight = self.workers.len(), "Waiting for flush workers");
        self.workers.wait().await;

        self.lifecycle.mark_stopped();
        info!(batches = self.next_seq, "Buffer dispatcher stopped");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
