//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Contents
//! - `BufferSettings`: serializable numeric configuration of a buffer
//! - `BatchProcessor`: the external batch-processing collaborator
//! - `FlushReport`: per-batch observation emitted by flush workers
//! - `ContractError`: configuration and IO errors

mod error;
mod flush;
mod processor;
mod settings;

pub use error::*;
pub use flush::*;
pub use processor::{BatchProcessor, BoxError, LocalBatchProcessor};
pub use settings::*;
