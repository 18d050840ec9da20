//! Workload statistics.

use std::time::Duration;

use buffered::MetricsSnapshot;
use observability::{FlushSummary, RunningStats, StatsSummary};

/// Statistics from a workload run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Items the buffer accepted
    pub submitted: u64,

    /// Items answered with their own ack
    pub succeeded: u64,

    /// Items answered with a flush error
    pub failed: u64,

    /// Items the buffer refused (stopped or not started)
    pub rejected: u64,

    /// Items answered with another caller's ack
    pub mismatched: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Submit-to-response latency in milliseconds
    pub response_latency_ms: RunningStats,

    /// Buffer counters at the end of the run
    pub buffer: Option<MetricsSnapshot>,

    /// Per-batch statistics collected by the buffer
    pub flushes: FlushSummary,
}

impl RunStats {
    /// Answered items per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            (self.succeeded + self.failed) as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Workload Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Submitted: {}", self.submitted);
        println!("   ├─ Succeeded: {}", self.succeeded);
        println!("   ├─ Failed: {}", self.failed);
        println!("   ├─ Rejected: {}", self.rejected);
        println!("   ├─ Wrong caller: {}", self.mismatched);
        println!("   ├─ Throughput: {:.2} items/s", self.throughput());
        println!(
            "   └─ Response latency (ms): {}",
            StatsSummary::from(&self.response_latency_ms)
        );

        let summary = &self.flushes;
        println!("\n📈 Batches");
        println!("   ├─ Total: {}", summary.total_batches);
        println!(
            "   ├─ Failed: {} ({:.2}%)",
            summary.failed_batches, summary.failure_rate
        );
        println!("   ├─ Size: {}", summary.batch_size);
        println!("   ├─ Weight: {}", summary.batch_weight);
        println!("   └─ Flush latency (ms): {}", summary.flush_latency_ms);

        if !summary.by_reason.is_empty() {
            println!("\n🔀 Flush Reasons");
            for (reason, count) in &summary.by_reason {
                println!("   ├─ {}: {}", reason, count);
            }
        }

        if let Some(snapshot) = self.buffer {
            println!(
                "\n📦 Buffer: submitted={} flushed={} failed={} queued={}",
                snapshot.submitted_count,
                snapshot.flushed_count,
                snapshot.failed_count,
                snapshot.queue_len
            );
        }

        println!();
    }
}
