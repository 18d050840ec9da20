//! Load generation against a simulated batch processor.

mod processor;
mod runner;
mod stats;

pub use processor::{Ack, Job, SimulatedProcessor};
pub use runner::{Workload, WorkloadConfig};
pub use stats::RunStats;
