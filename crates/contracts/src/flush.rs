//! Flush observations - produced by flush workers, consumed by observability.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which trigger cut a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// Queue length reached the capacity threshold
    Capacity,
    /// Cumulative weight reached the size threshold
    Size,
    /// Flush period elapsed since the first queued item
    Period,
    /// Final cut during shutdown
    Shutdown,
}

impl FlushReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Capacity => "capacity",
            Self::Size => "size",
            Self::Period => "period",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a batch's processing call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushOutcome {
    /// One result per item was delivered
    Success,
    /// The processor returned an error
    ProcessorError,
    /// The processor returned the wrong number of results
    CountMismatch,
    /// The processor panicked
    Panicked,
}

impl FlushOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ProcessorError => "processor_error",
            Self::CountMismatch => "count_mismatch",
            Self::Panicked => "panicked",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One flushed batch, as seen by its flush worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushReport {
    /// Buffer label
    pub label: String,
    /// Monotonic batch sequence number within the buffer
    pub batch_seq: u64,
    /// Trigger that cut the batch
    pub reason: FlushReason,
    /// Number of entries in the batch
    pub items: usize,
    /// Cumulative weight of the batch
    pub weight: usize,
    /// Time spent in the processing call
    pub latency: Duration,
    /// Result of the processing call
    pub outcome: FlushOutcome,
}
