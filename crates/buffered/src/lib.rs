//! # Buffered
//!
//! In-process batching buffer.
//!
//! Responsibilities:
//! - Accept single items from many concurrent callers
//! - Cut batches on capacity, cumulative weight or elapsed time
//! - Hand each batch to the processing function without stalling submissions
//! - Route every result (or the batch's error) back to its own submitter

mod buffer;
mod dispatcher;
mod entry;
pub mod error;
pub mod metrics;
mod options;
mod validate;
mod worker;

pub use buffer::{Buffer, BufferState, ShutdownHandle};
pub use contracts::{BatchProcessor, BoxError, BufferSettings, ContractError, FlushReason};
pub use entry::{Response, ResponseSignal};
pub use error::{BufferError, FlushError};
pub use metrics::{BufferMetrics, MetricsSnapshot};
pub use options::{BufferOptions, FlushFn, FlushFuture, SizeFn};
pub use validate::validate;
