//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use super::load_settings;
use crate::cli::InfoArgs;
use contracts::BufferSettings;

/// Effective settings for JSON output
#[derive(Serialize)]
struct ConfigInfo<'a> {
    config_path: String,
    label: &'a str,
    max_capacity: usize,
    flush_period_ms: u64,
    max_data_size: usize,
    /// Item weight at or above which the size threshold fires no later than capacity
    size_bound_item_weight: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let settings = load_settings(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&settings, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&settings, args);
    }

    Ok(())
}

fn build_config_info<'a>(settings: &'a BufferSettings, args: &InfoArgs) -> ConfigInfo<'a> {
    ConfigInfo {
        config_path: args.config.display().to_string(),
        label: &settings.label,
        max_capacity: settings.max_capacity,
        flush_period_ms: settings.flush_period_ms,
        max_data_size: settings.max_data_size,
        size_bound_item_weight: settings
            .max_data_size
            .div_ceil(settings.max_capacity),
    }
}

fn print_config_info(settings: &BufferSettings, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Buffer Configuration                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📄 Source: {}", args.config.display());
    println!("\n⚙️  Thresholds ({})", settings.label);
    println!("   ├─ Max capacity: {} items", settings.max_capacity);
    println!("   ├─ Flush period: {} ms", settings.flush_period_ms);
    println!("   └─ Max data size: {}", settings.max_data_size);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_info() {
        let settings = BufferSettings {
            label: "orders".into(),
            max_capacity: 3,
            flush_period_ms: 100,
            max_data_size: 10,
        };
        let args = InfoArgs {
            config: "orders.toml".into(),
            json: true,
        };
        let info = build_config_info(&settings, &args);
        assert_eq!(info.label, "orders");
        assert_eq!(info.size_bound_item_weight, 4);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["flush_period_ms"], 100);
    }
}
