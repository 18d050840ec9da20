//! Simple Buffer Example
//!
//! Submits one item to a buffer that flushes after 2 items, 100 bytes or 5
//! seconds, waits for its response and shuts down.
//!
//! Run with: cargo run -p demos --bin simple_buffer

use std::time::Duration;

use buffered::{BoxError, Buffer, BufferOptions};

#[derive(Debug, Clone)]
struct MockItem {
    id: u64,
    size: usize,
}

#[derive(Debug, Clone)]
struct MockResult {
    id: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let options = BufferOptions::new("simple")
        .with_max_capacity(2)
        .with_flush_period(Duration::from_secs(5))
        .with_max_data_size(100)
        .with_flush_fn(|_cancel, items: Vec<MockItem>| async move {
            Ok::<_, BoxError>(
                items
                    .into_iter()
                    .map(|item| MockResult { id: item.id })
                    .collect(),
            )
        })
        .with_size_fn(|item: &MockItem| item.size);

    let buffer = Buffer::new(options);
    let shutdown = buffer.start()?;

    let signal = buffer.submit(MockItem { id: 1, size: 10 }).await?;
    tracing::info!("Item submitted, waiting for the period flush...");

    match signal.await {
        Ok(result) => println!("Result: id={}", result.id),
        Err(e) => println!("Error: {}", e),
    }

    shutdown.shutdown().await;
    Ok(())
}
