//! Workload runner - drives one buffer with concurrent submitters.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use buffered::{Buffer, BufferOptions, Response};
use contracts::BufferSettings;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{Ack, Job, RunStats, SimulatedProcessor};
use crate::error::{CliError, Result};

/// Workload configuration
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Buffer thresholds
    pub settings: BufferSettings,

    /// Number of jobs to submit
    pub items: u64,

    /// Payload size of every job
    pub item_size: usize,

    /// Simulated per-batch processing latency
    pub latency: Duration,

    /// Probability that a batch fails
    pub failure_rate: f64,
}

/// What one submitter observed
enum Outcome {
    Answered {
        id: u64,
        response: Response<Ack>,
        latency: Duration,
    },
    Rejected,
}

/// One run of jobs through a fresh buffer
pub struct Workload {
    config: WorkloadConfig,
}

impl Workload {
    pub fn new(config: WorkloadConfig) -> Self {
        Self { config }
    }

    /// Submit every job concurrently and wait for all responses
    ///
    /// When `interrupt` completes first the buffer is shut down early; jobs
    /// already accepted are still answered, later ones are rejected.
    pub async fn run(self, interrupt: impl Future<Output = ()> + Send + 'static) -> Result<RunStats> {
        let config = self.config;
        let processor = Arc::new(SimulatedProcessor::new(
            format!("{}-sim", config.settings.label),
            config.latency,
            config.failure_rate,
        ));
        let options = BufferOptions::from_settings(&config.settings)
            .with_processor(processor)
            .with_size_fn(Job::weight);

        let buffer = Arc::new(Buffer::new(options));
        let shutdown = buffer.start()?;

        let on_interrupt = shutdown.clone();
        let watcher = tokio::spawn(async move {
            interrupt.await;
            warn!("Received shutdown signal, stopping buffer...");
            on_interrupt.shutdown().await;
        });

        info!(
            items = config.items,
            item_size = config.item_size,
            label = %config.settings.label,
            "Submitting jobs"
        );

        let started = Instant::now();
        let mut submitters = JoinSet::new();
        for id in 0..config.items {
            let buffer = Arc::clone(&buffer);
            let job = Job::new(id, config.item_size);
            submitters.spawn(async move {
                let submitted_at = Instant::now();
                match buffer.submit(job).await {
                    Ok(signal) => Outcome::Answered {
                        id,
                        response: signal.await,
                        latency: submitted_at.elapsed(),
                    },
                    Err(e) => {
                        debug!(id, error = %e, "Submission rejected");
                        Outcome::Rejected
                    }
                }
            });
        }

        let mut stats = RunStats::default();
        while let Some(joined) = submitters.join_next().await {
            match joined? {
                Outcome::Answered {
                    id,
                    response,
                    latency,
                } => {
                    stats.submitted += 1;
                    stats
                        .response_latency_ms
                        .push(latency.as_secs_f64() * 1000.0);
                    match response {
                        Ok(ack) if ack.id == id => stats.succeeded += 1,
                        Ok(ack) => {
                            warn!(expected = id, actual = ack.id, "Ack delivered to the wrong caller");
                            stats.mismatched += 1;
                        }
                        Err(_) => stats.failed += 1,
                    }
                }
                Outcome::Rejected => stats.rejected += 1,
            }
        }

        shutdown.shutdown().await;
        watcher.abort();
        stats.duration = started.elapsed();
        stats.buffer = Some(buffer.metrics().snapshot());
        stats.flushes = buffer.metrics().flush_summary();

        if stats.mismatched > 0 {
            return Err(CliError::IdentityMismatch {
                count: stats.mismatched,
            });
        }
        Ok(stats)
    }
}
