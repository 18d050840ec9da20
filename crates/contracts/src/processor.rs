//! BatchProcessor trait - the external batch handler
//!
//! Defines the abstract interface of the processing collaborator.

use tokio_util::sync::CancellationToken;

/// Boxed error returned by processors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Batch processing trait
///
/// Receives the items of one batch in arrival order and must return exactly
/// one result per item, in the same order.
#[trait_variant::make(BatchProcessor: Send)]
pub trait LocalBatchProcessor {
    /// Submitted item type
    type Item;
    /// Per-item result type
    type Output;

    /// Processor name (used for logging)
    fn name(&self) -> &str;

    /// Process one batch
    ///
    /// `cancel` is the cancellation context the buffer was started with.
    ///
    /// # Errors
    /// Any error fails every item of the batch.
    async fn process(
        &self,
        cancel: CancellationToken,
        items: Vec<Self::Item>,
    ) -> Result<Vec<Self::Output>, BoxError>;
}
