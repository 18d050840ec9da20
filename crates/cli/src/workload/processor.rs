//! Simulated batch processor: echoes job ids after a fixed latency.

use std::time::Duration;

use contracts::{BatchProcessor, BoxError};
use tokio_util::sync::CancellationToken;

/// One submitted unit of work
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub payload: Vec<u8>,
}

impl Job {
    pub fn new(id: u64, size: usize) -> Self {
        Self {
            id,
            payload: vec![0; size],
        }
    }

    /// Weight used by the buffer's size threshold
    pub fn weight(&self) -> usize {
        self.payload.len()
    }
}

/// Per-job result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub id: u64,
    pub bytes: usize,
}

/// Processor that sleeps, then either fails the whole batch or acks every job
#[derive(Debug)]
pub struct SimulatedProcessor {
    name: String,
    latency: Duration,
    failure_rate: f64,
}

impl SimulatedProcessor {
    pub fn new(name: impl Into<String>, latency: Duration, failure_rate: f64) -> Self {
        Self {
            name: name.into(),
            latency,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

impl BatchProcessor for SimulatedProcessor {
    type Item = Job;
    type Output = Ack;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        cancel: CancellationToken,
        items: Vec<Job>,
    ) -> Result<Vec<Ack>, BoxError> {
        tokio::select! {
            _ = cancel.cancelled() => return Err("processing cancelled".into()),
            _ = tokio::time::sleep(self.latency) => {}
        }

        if rand::random_bool(self.failure_rate) {
            return Err(format!("{}: simulated failure for batch of {}", self.name, items.len()).into());
        }

        Ok(items
            .into_iter()
            .map(|job| Ack {
                id: job.id,
                bytes: job.payload.len(),
            })
            .collect())
    }
}
