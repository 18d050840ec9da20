//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置文件 -> Buffer -> 响应 的端到端测试

#[cfg(test)]
mod contract_tests {
    use contracts::{BufferSettings, FlushOutcome, FlushReason};

    #[test]
    fn test_flush_labels_are_stable() {
        // Metric label values; dashboards depend on them.
        assert_eq!(FlushReason::Capacity.as_str(), "capacity");
        assert_eq!(FlushReason::Size.as_str(), "size");
        assert_eq!(FlushReason::Period.as_str(), "period");
        assert_eq!(FlushReason::Shutdown.as_str(), "shutdown");
        assert_eq!(FlushOutcome::CountMismatch.as_str(), "count_mismatch");
    }

    #[test]
    fn test_default_settings_snapshot() {
        let settings = BufferSettings::default();
        assert_eq!(settings.label, "buffer");
        assert_eq!(settings.max_capacity, 100);
        assert_eq!(settings.flush_period_ms, 1000);
        assert_eq!(settings.max_data_size, 1024 * 1024);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use buffered::{BatchProcessor, BoxError, Buffer, BufferOptions, BufferState, FlushError};
    use config_loader::{ConfigFormat, ConfigLoader};
    use rand::seq::SliceRandom;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Clone)]
    struct Order {
        id: u64,
        bytes: usize,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Receipt {
        order_id: u64,
        batch_len: usize,
    }

    /// Processor that records batch sizes and stamps each receipt with its batch length
    #[derive(Default)]
    struct OrderWriter {
        batches: AtomicUsize,
        largest: AtomicUsize,
    }

    impl BatchProcessor for OrderWriter {
        type Item = Order;
        type Output = Receipt;

        fn name(&self) -> &str {
            "order-writer"
        }

        async fn process(
            &self,
            _cancel: CancellationToken,
            items: Vec<Order>,
        ) -> Result<Vec<Receipt>, BoxError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.largest.fetch_max(items.len(), Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            let batch_len = items.len();
            Ok(items
                .into_iter()
                .map(|o| Receipt {
                    order_id: o.id,
                    batch_len,
                })
                .collect())
        }
    }

    const ORDERS_TOML: &str = r#"
label = "orders"
max_capacity = 4
flush_period_ms = 50
max_data_size = 1000
"#;

    /// End-to-end test: config file -> BufferSettings -> Buffer -> per-caller receipts
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析并校验配置
    /// 2. Buffer 按阈值切分批次
    /// 3. 每个调用方收到自己的结果
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_config_to_receipts() {
        let settings = ConfigLoader::load_from_str(ORDERS_TOML, ConfigFormat::Toml).unwrap();
        let writer = Arc::new(OrderWriter::default());
        let options = BufferOptions::from_settings(&settings)
            .with_processor(Arc::clone(&writer))
            .with_size_fn(|o: &Order| o.bytes);

        let buffer = Arc::new(Buffer::new(options));
        let shutdown = buffer.start().unwrap();

        let mut ids: Vec<u64> = (0..64).collect();
        ids.shuffle(&mut rand::rng());

        let mut tasks = Vec::new();
        for id in ids {
            let buffer = Arc::clone(&buffer);
            tasks.push(tokio::spawn(async move {
                let signal = buffer.submit(Order { id, bytes: 10 }).await.unwrap();
                (id, signal.await)
            }));
        }

        for task in tasks {
            let (id, receipt) = tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("receipt timed out")
                .unwrap();
            let receipt = receipt.unwrap();
            assert_eq!(receipt.order_id, id);
            assert!(receipt.batch_len <= 4);
        }

        shutdown.shutdown().await;
        assert_eq!(buffer.state(), BufferState::Stopped);
        assert!(writer.largest.load(Ordering::SeqCst) <= 4);

        let summary = buffer.metrics().flush_summary();
        assert_eq!(summary.total_items, 64);
        assert_eq!(summary.total_batches as usize, writer.batches.load(Ordering::SeqCst));
        assert_eq!(buffer.metrics().snapshot().flushed_count, 64);
    }

    /// Size threshold configured from a file drives batching
    #[tokio::test]
    async fn test_e2e_size_threshold_from_json() {
        let settings = ConfigLoader::load_from_str(
            r#"{ "label": "blobs", "max_capacity": 100, "flush_period_ms": 60000, "max_data_size": 50 }"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let options = BufferOptions::from_settings(&settings)
            .with_processor(Arc::new(OrderWriter::default()))
            .with_size_fn(|o: &Order| o.bytes);

        let buffer = Buffer::new(options);
        let shutdown = buffer.start().unwrap();

        let small = buffer.submit(Order { id: 1, bytes: 20 }).await.unwrap();
        let large = buffer.submit(Order { id: 2, bytes: 30 }).await.unwrap();

        let receipts = tokio::time::timeout(Duration::from_secs(2), async {
            (small.await.unwrap(), large.await.unwrap())
        })
        .await
        .expect("size threshold should flush without waiting for the period");
        assert_eq!(receipts.0.batch_len, 2);
        assert_eq!(receipts.1.order_id, 2);

        shutdown.shutdown().await;
    }

    /// Processor errors reach every caller of the failing batch only
    #[tokio::test]
    async fn test_e2e_failures_are_per_batch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let options: BufferOptions<u64, u64> = BufferOptions::new("flaky")
            .with_max_capacity(2)
            .with_flush_period(Duration::from_secs(60))
            .with_max_data_size(1000)
            .with_size_fn(|_: &u64| 1)
            .with_flush_fn(move |_cancel, items: Vec<u64>| {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err::<Vec<u64>, BoxError>("storage unavailable".into())
                    } else {
                        Ok(items)
                    }
                }
            });

        let buffer = Buffer::new(options);
        let shutdown = buffer.start().unwrap();

        let first = [
            buffer.submit(1).await.unwrap(),
            buffer.submit(2).await.unwrap(),
        ];
        for signal in first {
            match signal.await {
                Err(FlushError::Processor(e)) => assert_eq!(e.to_string(), "storage unavailable"),
                other => panic!("unexpected response: {other:?}"),
            }
        }

        let second = [
            buffer.submit(3).await.unwrap(),
            buffer.submit(4).await.unwrap(),
        ];
        let mut results = Vec::new();
        for signal in second {
            results.push(signal.await.unwrap());
        }
        assert_eq!(results, vec![3, 4]);

        shutdown.shutdown().await;
        let snapshot = buffer.metrics().snapshot();
        assert_eq!(snapshot.failed_count, 2);
        assert_eq!(snapshot.flushed_count, 2);
    }

    /// Logs routed to a caller-provided subscriber
    #[tokio::test]
    async fn test_e2e_custom_log_sink() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let options: BufferOptions<u32, u32> = BufferOptions::new("logged")
            .with_max_capacity(1)
            .with_size_fn(|_: &u32| 1)
            .with_flush_fn(|_cancel, items: Vec<u32>| async move { Ok::<_, BoxError>(items) })
            .with_log_dispatch(tracing::Dispatch::new(subscriber));

        let buffer = Buffer::new(options);
        let shutdown = buffer.start().unwrap();
        assert_eq!(buffer.submit(11).await.unwrap().await.unwrap(), 11);
        shutdown.shutdown().await;
    }

    /// Blocking callers outside the runtime wait on their signal
    #[test]
    fn test_e2e_blocking_wait() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let options: BufferOptions<u32, String> = BufferOptions::new("sync-callers")
            .with_max_capacity(1)
            .with_size_fn(|_: &u32| 1)
            .with_flush_fn(|_cancel, items: Vec<u32>| async move {
                Ok::<_, BoxError>(items.into_iter().map(|i| format!("#{i}")).collect())
            });
        let buffer = Buffer::new(options);

        let shutdown = {
            let _guard = runtime.enter();
            buffer.start().unwrap()
        };
        let signal = runtime.block_on(buffer.submit(5)).unwrap();
        assert_eq!(signal.blocking_wait().unwrap(), "#5");

        runtime.block_on(shutdown.shutdown());
        assert!(shutdown.is_stopped());
    }
}
