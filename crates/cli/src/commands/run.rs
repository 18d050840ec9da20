//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::BufferSettings;
use std::time::Duration;
use tracing::info;

use super::load_settings;
use crate::cli::RunArgs;
use crate::workload::{Workload, WorkloadConfig};

/// Execute the `run` command
pub async fn run_workload(args: &RunArgs) -> Result<()> {
    let settings = resolve_settings(args)?;

    info!(
        label = %settings.label,
        max_capacity = settings.max_capacity,
        flush_period_ms = settings.flush_period_ms,
        max_data_size = settings.max_data_size,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let workload = Workload::new(WorkloadConfig {
        settings,
        items: args.items,
        item_size: args.item_size,
        latency: Duration::from_millis(args.latency_ms),
        failure_rate: args.failure_rate,
    });

    info!("Starting workload...");
    let stats = workload
        .run(setup_shutdown_signal())
        .await
        .context("Workload execution failed")?;

    info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        rejected = stats.rejected,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Workload completed"
    );
    stats.print_summary();

    Ok(())
}

/// Settings from the optional config file, then CLI overrides, then validation
fn resolve_settings(args: &RunArgs) -> Result<BufferSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            load_settings(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => BufferSettings::default(),
    };

    if let Some(max_capacity) = args.max_capacity {
        info!(max_capacity, "Overriding max_capacity from CLI");
        settings.max_capacity = max_capacity;
    }
    if let Some(flush_period_ms) = args.flush_period_ms {
        info!(flush_period_ms, "Overriding flush_period_ms from CLI");
        settings.flush_period_ms = flush_period_ms;
    }
    if let Some(max_data_size) = args.max_data_size {
        info!(max_data_size, "Overriding max_data_size from CLI");
        settings.max_data_size = max_data_size;
    }

    config_loader::ConfigLoader::validate(&settings).context("Invalid settings after overrides")?;
    Ok(settings)
}

/// Resolves on Ctrl+C or SIGTERM; never resolves if no handler can be installed
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
