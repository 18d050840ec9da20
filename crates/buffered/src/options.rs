//! Buffer options - thresholds plus the injected processing and weight functions

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use contracts::{BatchProcessor, BoxError, BufferSettings};
use tokio_util::sync::CancellationToken;

/// Future returned by a flush function
pub type FlushFuture<R> = Pin<Box<dyn Future<Output = Result<Vec<R>, BoxError>> + Send>>;

/// Shared batch-processing function: items in order, results in order
pub type FlushFn<I, R> = Arc<dyn Fn(CancellationToken, Vec<I>) -> FlushFuture<R> + Send + Sync>;

/// Shared per-item weight function
pub type SizeFn<I> = Arc<dyn Fn(&I) -> usize + Send + Sync>;

/// Buffer configuration
///
/// Immutable once handed to [`crate::Buffer::new`]. Nothing is checked here;
/// [`crate::validate`] runs when the buffer is started.
pub struct BufferOptions<I, R> {
    /// Observability tag
    pub label: String,
    /// Cut a batch when this many items are queued
    pub max_capacity: usize,
    /// Cut a batch when this much time passed since the queue became non-empty
    pub flush_period: Duration,
    /// Cut a batch when the cumulative item weight reaches this value
    pub max_data_size: usize,
    /// Batch-processing function
    pub flush_fn: Option<FlushFn<I, R>>,
    /// Item weight function
    pub size_fn: Option<SizeFn<I>>,
    /// Optional logging sink; defaults to the subscriber current at start
    pub log_dispatch: Option<tracing::Dispatch>,
}

impl<I, R> BufferOptions<I, R>
where
    I: Send + 'static,
    R: Send + 'static,
{
    /// Options with default thresholds and no functions attached
    pub fn new(label: impl Into<String>) -> Self {
        Self::from_settings(&BufferSettings {
            label: label.into(),
            ..BufferSettings::default()
        })
    }

    /// Options from loaded settings; functions still need to be attached
    pub fn from_settings(settings: &BufferSettings) -> Self {
        Self {
            label: settings.label.clone(),
            max_capacity: settings.max_capacity,
            flush_period: settings.flush_period(),
            max_data_size: settings.max_data_size,
            flush_fn: None,
            size_fn: None,
            log_dispatch: None,
        }
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_flush_period(mut self, flush_period: Duration) -> Self {
        self.flush_period = flush_period;
        self
    }

    pub fn with_max_data_size(mut self, max_data_size: usize) -> Self {
        self.max_data_size = max_data_size;
        self
    }

    /// Attach an async closure as the processing function
    pub fn with_flush_fn<F, Fut, E>(mut self, f: F) -> Self
    where
        F: Fn(CancellationToken, Vec<I>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<R>, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.flush_fn = Some(Arc::new(
            move |cancel: CancellationToken, items: Vec<I>| -> FlushFuture<R> {
                let fut = f(cancel, items);
                Box::pin(async move { fut.await.map_err(Into::into) })
            },
        ));
        self
    }

    /// Attach a [`BatchProcessor`] as the processing function
    pub fn with_processor<P>(mut self, processor: Arc<P>) -> Self
    where
        P: BatchProcessor<Item = I, Output = R> + Sync + 'static,
    {
        self.flush_fn = Some(Arc::new(
            move |cancel: CancellationToken, items: Vec<I>| -> FlushFuture<R> {
                let processor = Arc::clone(&processor);
                Box::pin(async move { processor.process(cancel, items).await })
            },
        ));
        self
    }

    /// Attach the item weight function
    pub fn with_size_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&I) -> usize + Send + Sync + 'static,
    {
        self.size_fn = Some(Arc::new(f));
        self
    }

    /// Route buffer logs to a specific subscriber
    pub fn with_log_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.log_dispatch = Some(dispatch);
        self
    }

    /// Numeric part of the options
    pub fn settings(&self) -> BufferSettings {
        BufferSettings {
            label: self.label.clone(),
            max_capacity: self.max_capacity,
            flush_period_ms: u64::try_from(self.flush_period.as_millis()).unwrap_or(u64::MAX),
            max_data_size: self.max_data_size,
        }
    }
}

impl<I, R> Clone for BufferOptions<I, R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            max_capacity: self.max_capacity,
            flush_period: self.flush_period,
            max_data_size: self.max_data_size,
            flush_fn: self.flush_fn.clone(),
            size_fn: self.size_fn.clone(),
            log_dispatch: self.log_dispatch.clone(),
        }
    }
}

impl<I, R> std::fmt::Debug for BufferOptions<I, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferOptions")
            .field("label", &self.label)
            .field("max_capacity", &self.max_capacity)
            .field("flush_period", &self.flush_period)
            .field("max_data_size", &self.max_data_size)
            .field("flush_fn", &self.flush_fn.is_some())
            .field("size_fn", &self.size_fn.is_some())
            .field("log_dispatch", &self.log_dispatch.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl BatchProcessor for Echo {
        type Item = u32;
        type Output = u32;

        fn name(&self) -> &str {
            "echo"
        }

        async fn process(
            &self,
            _cancel: CancellationToken,
            items: Vec<u32>,
        ) -> Result<Vec<u32>, BoxError> {
            Ok(items)
        }
    }

    #[test]
    fn test_from_settings_copies_thresholds() {
        let settings = BufferSettings {
            label: "orders".into(),
            max_capacity: 7,
            flush_period_ms: 250,
            max_data_size: 99,
        };
        let opts: BufferOptions<u32, u32> = BufferOptions::from_settings(&settings);
        assert_eq!(opts.label, "orders");
        assert_eq!(opts.max_capacity, 7);
        assert_eq!(opts.flush_period, Duration::from_millis(250));
        assert_eq!(opts.max_data_size, 99);
        assert!(opts.flush_fn.is_none());
        assert_eq!(opts.settings(), settings);
    }

    #[tokio::test]
    async fn test_with_flush_fn_boxes_errors() {
        let opts: BufferOptions<u32, u32> = BufferOptions::new("t")
            .with_flush_fn(|_cancel, _items: Vec<u32>| async { Err::<Vec<u32>, _>("boom") });
        let flush = opts.flush_fn.expect("flush_fn set");
        let err = flush(CancellationToken::new(), vec![1]).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_with_processor() {
        let opts: BufferOptions<u32, u32> = BufferOptions::new("t").with_processor(Arc::new(Echo));
        let flush = opts.flush_fn.clone().expect("flush_fn set");
        let out = flush(CancellationToken::new(), vec![4, 5]).await.unwrap();
        assert_eq!(out, vec![4, 5]);
        assert!(format!("{opts:?}").contains("flush_fn: true"));
    }
}
