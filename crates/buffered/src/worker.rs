//! Flush worker - runs the processing function on one cut batch and answers every entry

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use contracts::{FlushOutcome, FlushReport};
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, instrument, warn, Instrument};

use crate::entry::{Batch, Responder};
use crate::error::FlushError;
use crate::metrics::BufferMetrics;
use crate::options::FlushFn;

/// Everything a flush worker needs besides its batch
pub(crate) struct FlushContext<I, R> {
    pub(crate) label: Arc<str>,
    pub(crate) flush_fn: FlushFn<I, R>,
    pub(crate) cancel: CancellationToken,
    pub(crate) metrics: Arc<BufferMetrics>,
}

impl<I, R> Clone for FlushContext<I, R> {
    fn clone(&self) -> Self {
        Self {
            label: Arc::clone(&self.label),
            flush_fn: Arc::clone(&self.flush_fn),
            cancel: self.cancel.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Process one batch and deliver exactly one response per entry
///
/// The processing call runs in its own task so a panic inside it is
/// contained to this batch.
#[instrument(
    name = "buffer_flush",
    skip_all,
    fields(buffer = %ctx.label, batch = batch.seq, reason = %batch.reason, items = batch.len())
)]
pub(crate) async fn flush_batch<I, R>(ctx: FlushContext<I, R>, batch: Batch<I, R>)
where
    I: Send + 'static,
    R: Send + 'static,
{
    let seq = batch.seq;
    let reason = batch.reason;
    let weight = batch.weight;
    let (items, responders) = batch.into_parts();
    let expected = items.len();

    let started = Instant::now();
    let flush_fn = Arc::clone(&ctx.flush_fn);
    let cancel = ctx.cancel.clone();
    let call = async move { flush_fn(cancel, items).await };
    let joined = tokio::spawn(call.in_current_span().with_current_subscriber()).await;
    let latency = started.elapsed();

    let outcome = match joined {
        Ok(Ok(results)) if results.len() == expected => {
            let undelivered = responders
                .into_iter()
                .zip(results)
                .map(|(responder, result)| responder.respond(Ok(result)))
                .filter(|delivered| !delivered)
                .count();
            debug!(
                latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                undelivered, "Batch flushed"
            );
            FlushOutcome::Success
        }
        Ok(Ok(results)) => {
            warn!(expected, actual = results.len(), "Processor returned wrong result count");
            fail_all(
                responders,
                FlushError::ResultCountMismatch {
                    expected,
                    actual: results.len(),
                },
            );
            FlushOutcome::CountMismatch
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Processor failed");
            fail_all(responders, FlushError::processor(e));
            FlushOutcome::ProcessorError
        }
        Err(join_err) => {
            let message = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                join_err.to_string()
            };
            error!(panic = %message, "Processor panicked");
            fail_all(responders, FlushError::Panicked { message });
            FlushOutcome::Panicked
        }
    };

    let report = FlushReport {
        label: ctx.label.to_string(),
        batch_seq: seq,
        reason,
        items: expected,
        weight,
        latency,
        outcome,
    };
    ctx.metrics.record_flush(&report);
    observability::record_flush_metrics(&report);
}

fn fail_all<R>(responders: Vec<Responder<R>>, err: FlushError) {
    for responder in responders {
        responder.respond(Err(err.clone()));
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, ResponseSignal};
    use crate::options::BufferOptions;
    use contracts::{BoxError, FlushReason};

    fn context(opts: BufferOptions<u32, u32>) -> FlushContext<u32, u32> {
        FlushContext {
            label: Arc::from(opts.label.as_str()),
            flush_fn: opts.flush_fn.expect("flush_fn set"),
            cancel: CancellationToken::new(),
            metrics: Arc::new(BufferMetrics::new()),
        }
    }

    fn batch_of(items: &[u32]) -> (Batch<u32, u32>, Vec<ResponseSignal<u32>>) {
        let (entries, signals): (Vec<_>, Vec<_>) =
            items.iter().map(|&item| Entry::new(item, 1)).unzip();
        (
            Batch::new(1, FlushReason::Capacity, items.len(), entries),
            signals,
        )
    }

    #[tokio::test]
    async fn test_results_follow_positions() {
        let opts = BufferOptions::new("w").with_flush_fn(|_c, items: Vec<u32>| async move {
            Ok::<_, BoxError>(items.into_iter().map(|i| i * 10).collect())
        });
        let ctx = context(opts);
        let (batch, signals) = batch_of(&[1, 2, 3]);

        flush_batch(ctx.clone(), batch).await;

        let mut got = Vec::new();
        for signal in signals {
            got.push(signal.await.unwrap());
        }
        assert_eq!(got, vec![10, 20, 30]);
        assert_eq!(ctx.metrics.flushed_count(), 3);
    }

    #[tokio::test]
    async fn test_count_mismatch_fails_whole_batch() {
        let opts = BufferOptions::new("w")
            .with_flush_fn(|_c, _items: Vec<u32>| async move { Ok::<_, BoxError>(vec![1]) });
        let ctx = context(opts);
        let (batch, signals) = batch_of(&[1, 2]);

        flush_batch(ctx.clone(), batch).await;

        for signal in signals {
            assert!(matches!(
                signal.await,
                Err(FlushError::ResultCountMismatch {
                    expected: 2,
                    actual: 1
                })
            ));
        }
        assert_eq!(ctx.metrics.failed_count(), 2);
    }

    #[tokio::test]
    async fn test_processor_error_reaches_every_entry() {
        let opts = BufferOptions::new("w").with_flush_fn(|_c, _items: Vec<u32>| async move {
            Err::<Vec<u32>, BoxError>("write rejected".into())
        });
        let (batch, signals) = batch_of(&[1, 2, 3]);

        flush_batch(context(opts), batch).await;

        for signal in signals {
            let err = signal.await.unwrap_err();
            assert_eq!(err.to_string(), "flush failed: write rejected");
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let opts = BufferOptions::new("w").with_flush_fn(|_c, _items: Vec<u32>| async move {
            if true {
                panic!("processor exploded");
            }
            Ok::<Vec<u32>, BoxError>(Vec::new())
        });
        let (batch, signals) = batch_of(&[1, 2]);

        flush_batch(context(opts), batch).await;

        for signal in signals {
            match signal.await {
                Err(FlushError::Panicked { message }) => {
                    assert!(message.contains("processor exploded"))
                }
                other => panic!("unexpected response: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_cancellation_token_reaches_processor() {
        let opts = BufferOptions::new("w").with_flush_fn(|cancel: CancellationToken, items: Vec<u32>| async move {
            if cancel.is_cancelled() {
                Err::<Vec<u32>, BoxError>("cancelled".into())
            } else {
                Ok(items)
            }
        });
        let ctx = context(opts);
        ctx.cancel.cancel();
        let (batch, signals) = batch_of(&[1]);

        flush_batch(ctx, batch).await;

        for signal in signals {
            assert!(signal.await.is_err());
        }
    }
}
