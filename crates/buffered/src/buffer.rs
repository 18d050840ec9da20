//! Buffer - public handle: lifecycle, submission and safe introspection

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::ContractError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use crate::dispatcher::{Dispatcher, Thresholds};
use crate::entry::{Entry, ResponseSignal};
use crate::error::BufferError;
use crate::metrics::BufferMetrics;
use crate::options::BufferOptions;
use crate::validate::validate;
use crate::worker::FlushContext;

/// Buffer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Constructed, no background activity
    Created,
    /// Dispatcher running, submissions accepted
    Started,
    /// Shutdown complete (terminal)
    Stopped,
}

impl BufferState {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Started => 1,
            Self::Stopped => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Started,
            _ => Self::Stopped,
        }
    }
}

/// Lifecycle state shared by the buffer, its dispatcher and shutdown handles
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(BufferState::Created.to_u8()),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_started() -> Self {
        Self {
            state: AtomicU8::new(BufferState::Started.to_u8()),
        }
    }

    pub(crate) fn load(&self) -> BufferState {
        BufferState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Created -> Started; returns the observed state on failure
    fn try_start(&self) -> Result<(), BufferState> {
        self.state
            .compare_exchange(
                BufferState::Created.to_u8(),
                BufferState::Started.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(BufferState::from_u8)
    }

    pub(crate) fn mark_stopped(&self) {
        self.state
            .store(BufferState::Stopped.to_u8(), Ordering::Release);
    }
}

/// Batching buffer
///
/// Callers submit single items and await a per-item [`ResponseSignal`]; a
/// background dispatcher groups items into batches for the processing function.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use buffered::{Buffer, BufferOptions};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let opts = BufferOptions::new("ids")
///     .with_max_capacity(2)
///     .with_flush_period(Duration::from_secs(5))
///     .with_max_data_size(100)
///     .with_flush_fn(|_cancel, items: Vec<u32>| async move {
///         Ok::<_, buffered::BoxError>(items)
///     })
///     .with_size_fn(|_item: &u32| 1);
///
/// let buffer = Buffer::new(opts);
/// let shutdown = buffer.start()?;
/// let signal = buffer.submit(7).await?;
/// assert_eq!(signal.await?, 7);
/// shutdown.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Buffer<I, R> {
    opts: BufferOptions<I, R>,
    label: Arc<str>,
    tx: mpsc::Sender<Entry<I, R>>,
    rx: Mutex<Option<mpsc::Receiver<Entry<I, R>>>>,
    lifecycle: Arc<Lifecycle>,
    shutdown: CancellationToken,
    metrics: Arc<BufferMetrics>,
}

impl<I, R> Buffer<I, R>
where
    I: Send + 'static,
    R: Send + 'static,
{
    /// Create a buffer in `Created` state
    ///
    /// Performs no validation and starts nothing.
    pub fn new(opts: BufferOptions<I, R>) -> Self {
        // The mailbox is sized around the capacity threshold; a zero capacity
        // is rejected later by `start`, but the channel itself needs at least 1.
        let (tx, rx) = mpsc::channel(opts.max_capacity.max(1));
        let label = Arc::from(opts.label.as_str());

        Self {
            opts,
            label,
            tx,
            rx: Mutex::new(Some(rx)),
            lifecycle: Arc::new(Lifecycle::new()),
            shutdown: CancellationToken::new(),
            metrics: Arc::new(BufferMetrics::new()),
        }
    }

    /// Buffer label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Options the buffer was built with
    pub fn options(&self) -> &BufferOptions<I, R> {
        &self.opts
    }

    /// Current lifecycle state
    pub fn state(&self) -> BufferState {
        self.lifecycle.load()
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<BufferMetrics> {
        &self.metrics
    }

    /// Live queue length, read without touching the dispatcher
    pub fn queued_len(&self) -> usize {
        self.metrics.queue_len()
    }

    /// Live queue cumulative weight, read without touching the dispatcher
    pub fn queued_weight(&self) -> usize {
        self.metrics.queue_weight()
    }

    /// Validate the options and launch the dispatcher
    ///
    /// Processing calls receive a token that is never cancelled; use
    /// [`Buffer::start_with_cancellation`] to supply one.
    pub fn start(&self) -> Result<ShutdownHandle, BufferError> {
        self.start_with_cancellation(CancellationToken::new())
    }

    /// Validate the options and launch the dispatcher
    ///
    /// `cancel` is passed to every processing call.
    ///
    /// # Errors
    /// - Invalid options
    /// - Buffer already started (or stopped)
    /// - No tokio runtime on the calling thread; the buffer stays `Created`
    #[instrument(name = "buffer_start", skip_all, fields(buffer = %self.label))]
    pub fn start_with_cancellation(
        &self,
        cancel: CancellationToken,
    ) -> Result<ShutdownHandle, BufferError> {
        validate(&self.opts)?;
        let flush_fn = self.opts.flush_fn.clone().ok_or_else(|| {
            ContractError::config_validation("flush_fn", "processing function is required")
        })?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(BufferError::NoRuntime {
                label: self.label.to_string(),
            });
        }

        self.lifecycle
            .try_start()
            .map_err(|_| BufferError::AlreadyStarted {
                label: self.label.to_string(),
            })?;

        let mailbox = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| BufferError::AlreadyStarted {
                label: self.label.to_string(),
            })?;

        let dispatch = self
            .opts
            .log_dispatch
            .clone()
            .unwrap_or_else(|| tracing::dispatcher::get_default(|current| current.clone()));

        let thresholds = Thresholds {
            max_capacity: self.opts.max_capacity,
            flush_period: self.opts.flush_period,
            max_data_size: self.opts.max_data_size,
        };
        let flush_ctx = FlushContext {
            label: Arc::clone(&self.label),
            flush_fn,
            cancel,
            metrics: Arc::clone(&self.metrics),
        };
        let dispatcher = Dispatcher::new(
            thresholds,
            mailbox,
            flush_ctx,
            self.shutdown.clone(),
            Arc::clone(&self.lifecycle),
            dispatch,
        );
        let join = dispatcher.spawn();

        debug!("Buffer started");

        Ok(ShutdownHandle {
            inner: Arc::new(ShutdownInner {
                label: Arc::clone(&self.label),
                shutdown: self.shutdown.clone(),
                lifecycle: Arc::clone(&self.lifecycle),
                join: tokio::sync::Mutex::new(Some(join)),
            }),
        })
    }

    /// Submit one item
    ///
    /// Waits only if the dispatcher's mailbox is momentarily full. The returned
    /// signal resolves once the item's batch has been processed.
    ///
    /// # Errors
    /// Lifecycle error if the buffer is not in `Started` state.
    pub async fn submit(&self, item: I) -> Result<ResponseSignal<R>, BufferError> {
        let (entry, signal) = self.prepare(item)?;
        self.tx
            .send(entry)
            .await
            .map_err(|_| self.stopped_error())?;
        self.metrics.inc_submitted_count();
        observability::record_item_submitted(&self.label);
        Ok(signal)
    }

    /// Submit one item without waiting on a full mailbox
    ///
    /// # Errors
    /// Lifecycle error if not started, `MailboxFull` if the dispatcher is saturated.
    pub fn try_submit(&self, item: I) -> Result<ResponseSignal<R>, BufferError> {
        let (entry, signal) = self.prepare(item)?;
        self.tx.try_send(entry).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BufferError::MailboxFull {
                label: self.label.to_string(),
            },
            mpsc::error::TrySendError::Closed(_) => self.stopped_error(),
        })?;
        self.metrics.inc_submitted_count();
        observability::record_item_submitted(&self.label);
        Ok(signal)
    }

    fn prepare(&self, item: I) -> Result<(Entry<I, R>, ResponseSignal<R>), BufferError> {
        match self.lifecycle.load() {
            BufferState::Created => {
                return Err(BufferError::NotStarted {
                    label: self.label.to_string(),
                })
            }
            BufferState::Stopped => return Err(self.stopped_error()),
            BufferState::Started if self.shutdown.is_cancelled() => {
                return Err(self.stopped_error())
            }
            BufferState::Started => {}
        }

        let weight = self.opts.size_fn.as_ref().map_or(0, |size_fn| size_fn(&item));
        Ok(Entry::new(item, weight))
    }

    fn stopped_error(&self) -> BufferError {
        BufferError::Stopped {
            label: self.label.to_string(),
        }
    }
}

impl<I, R> std::fmt::Debug for Buffer<I, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("opts", &self.opts)
            .field("state", &self.lifecycle.load())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

struct ShutdownInner {
    label: Arc<str>,
    shutdown: CancellationToken,
    lifecycle: Arc<Lifecycle>,
    join: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Handle returned by `start`; stops the buffer
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<ShutdownInner>,
}

impl ShutdownHandle {
    /// Stop the buffer gracefully
    ///
    /// Stops accepting submissions, flushes whatever is queued, waits for every
    /// in-flight flush and returns once the buffer is `Stopped`. Calling it again,
    /// from any clone, returns after the same completion.
    #[instrument(name = "buffer_shutdown", skip(self), fields(buffer = %self.inner.label))]
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let mut join = self.inner.join.lock().await;
        if let Some(handle) = join.take() {
            if let Err(e) = handle.await {
                error!(error = ?e, "Dispatcher task panicked");
            }
            self.inner.lifecycle.mark_stopped();
            debug!("Buffer shutdown complete");
        }
    }

    /// True once shutdown has completed
    pub fn is_stopped(&self) -> bool {
        self.inner.lifecycle.load() == BufferState::Stopped
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("label", &self.inner.label)
            .field("state", &self.inner.lifecycle.load())
            .finish()
    }
}
