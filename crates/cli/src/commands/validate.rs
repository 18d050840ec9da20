//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::BufferSettings;
use serde::Serialize;
use tracing::info;

use super::load_settings;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<BufferSettings>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_settings(&args.config) {
        Ok(settings) => {
            let warnings = collect_warnings(&settings);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                settings: Some(settings),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            settings: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(settings: &BufferSettings) -> Vec<String> {
    let mut warnings = Vec::new();

    if settings.max_capacity == 1 {
        warnings.push("max_capacity is 1 - every item is flushed on its own".to_string());
    }

    if settings.max_data_size < settings.max_capacity {
        warnings.push(format!(
            "max_data_size ({}) is below max_capacity ({}) - the size threshold will usually fire first",
            settings.max_data_size, settings.max_capacity
        ));
    }

    if settings.flush_period_ms < 5 {
        warnings.push(format!(
            "flush_period_ms is {} - batches will rarely grow past a few items",
            settings.flush_period_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref settings) = result.settings {
            println!("\n  Label: {}", settings.label);
            println!("  Max capacity: {}", settings.max_capacity);
            println!("  Flush period: {} ms", settings.flush_period_ms);
            println!("  Max data size: {}", settings.max_data_size);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_have_no_warnings() {
        assert!(collect_warnings(&BufferSettings::default()).is_empty());
    }

    #[test]
    fn test_tiny_size_threshold_warns() {
        let settings = BufferSettings {
            max_capacity: 50,
            max_data_size: 10,
            ..Default::default()
        };
        let warnings = collect_warnings(&settings);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("max_data_size"));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/definitely/not/here.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
