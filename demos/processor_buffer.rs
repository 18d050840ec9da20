//! Processor Buffer Example
//!
//! Loads buffer settings (from the file given as first argument, or defaults),
//! attaches a `BatchProcessor`, and submits a burst of lines from concurrent
//! tasks. Each task prints the result it received.
//!
//! Run with: cargo run -p demos --bin processor_buffer -- buffer.toml

use std::sync::Arc;

use buffered::{BatchProcessor, BoxError, Buffer, BufferOptions, BufferSettings};
use config_loader::ConfigLoader;
use tokio_util::sync::CancellationToken;

/// Upper-cases a batch of lines in one call
struct Shouter;

impl BatchProcessor for Shouter {
    type Item = String;
    type Output = String;

    fn name(&self) -> &str {
        "shouter"
    }

    async fn process(
        &self,
        _cancel: CancellationToken,
        items: Vec<String>,
    ) -> Result<Vec<String>, BoxError> {
        tracing::info!(batch = items.len(), "Processing batch");
        Ok(items.into_iter().map(|line| line.to_uppercase()).collect())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(path = %path, "Loading buffer settings");
            ConfigLoader::load_from_path(std::path::Path::new(&path))?
        }
        None => BufferSettings {
            label: "shouter".to_string(),
            max_capacity: 4,
            flush_period_ms: 200,
            max_data_size: 64,
        },
    };

    let options = BufferOptions::from_settings(&settings)
        .with_processor(Arc::new(Shouter))
        .with_size_fn(String::len);

    let buffer = Arc::new(Buffer::new(options));
    let shutdown = buffer.start()?;

    let words = [
        "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
    ];
    let mut tasks = Vec::new();
    for word in words {
        let buffer = Arc::clone(&buffer);
        tasks.push(tokio::spawn(async move {
            let response = buffer.submit(word.to_string()).await?.await;
            Ok::<_, BoxError>((word, response))
        }));
    }

    for task in tasks {
        let (word, response) = task.await??;
        match response {
            Ok(result) => println!("{word:>8} -> {result}"),
            Err(e) => println!("{word:>8} -> error: {e}"),
        }
    }

    shutdown.shutdown().await;
    println!("\n{}", buffer.metrics().flush_summary());
    Ok(())
}
