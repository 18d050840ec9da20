//! Buffer metrics for observability
//!
//! Queue counters are written only by the dispatcher and read lock-free by
//! the safe accessors. Flush statistics are written only by flush workers.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use contracts::FlushReport;
use observability::{FlushStatsAggregator, FlushSummary};

/// Metrics for a single buffer
#[derive(Debug, Default)]
pub struct BufferMetrics {
    /// Live queue length
    queue_len: AtomicUsize,
    /// Live queue cumulative weight
    queue_weight: AtomicUsize,
    /// Items accepted by submit
    submitted_count: AtomicU64,
    /// Items whose batch was processed successfully
    flushed_count: AtomicU64,
    /// Items whose batch failed
    failed_count: AtomicU64,
    /// Per-batch statistics
    flush_stats: Mutex<FlushStatsAggregator>,
}

impl BufferMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Current live queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Acquire)
    }

    /// Current live queue weight
    pub fn queue_weight(&self) -> usize {
        self.queue_weight.load(Ordering::Acquire)
    }

    pub(crate) fn set_queue(&self, len: usize, weight: usize) {
        self.queue_len.store(len, Ordering::Release);
        self.queue_weight.store(weight, Ordering::Release);
    }

    /// Items accepted by submit
    pub fn submitted_count(&self) -> u64 {
        self.submitted_count.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_submitted_count(&self) {
        self.submitted_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Items answered with a result
    pub fn flushed_count(&self) -> u64 {
        self.flushed_count.load(Ordering::Relaxed)
    }

    /// Items answered with an error
    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    /// Record one processed batch
    pub(crate) fn record_flush(&self, report: &FlushReport) {
        let items = report.items as u64;
        if report.outcome.is_success() {
            self.flushed_count.fetch_add(items, Ordering::Relaxed);
        } else {
            self.failed_count.fetch_add(items, Ordering::Relaxed);
        }
        self.flush_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(report);
    }

    /// Summary of every batch flushed so far
    pub fn flush_summary(&self) -> FlushSummary {
        self.flush_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            queue_weight: self.queue_weight(),
            submitted_count: self.submitted_count(),
            flushed_count: self.flushed_count(),
            failed_count: self.failed_count(),
        }
    }
}

/// Snapshot of buffer counters (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub queue_weight: usize,
    pub submitted_count: u64,
    pub flushed_count: u64,
    pub failed_count: u64,
}
