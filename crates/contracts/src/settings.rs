//! BufferSettings - numeric buffer configuration shared by config loading and the engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::ContractError;

/// Fields in the order they are reported when several are invalid.
const FIELD_ORDER: [&str; 4] = ["label", "max_capacity", "flush_period_ms", "max_data_size"];

/// Serializable buffer configuration
///
/// The processing and weight functions cannot be expressed in a file; they are
/// attached in code when the settings are turned into buffer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BufferSettings {
    /// Observability tag (log spans, metric labels)
    #[serde(default = "default_label")]
    #[validate(length(min = 1, message = "label cannot be empty"))]
    pub label: String,

    /// Cut a batch once this many items are queued
    #[serde(default = "default_max_capacity")]
    #[validate(range(min = 1, message = "max_capacity must be > 0"))]
    pub max_capacity: usize,

    /// Cut a batch once this many milliseconds passed since the queue became non-empty
    #[serde(default = "default_flush_period_ms")]
    #[validate(range(min = 1, message = "flush_period_ms must be > 0"))]
    pub flush_period_ms: u64,

    /// Cut a batch once the cumulative item weight reaches this value
    #[serde(default = "default_max_data_size")]
    #[validate(range(min = 1, message = "max_data_size must be > 0"))]
    pub max_data_size: usize,
}

fn default_label() -> String {
    "buffer".to_string()
}

fn default_max_capacity() -> usize {
    100
}

fn default_flush_period_ms() -> u64 {
    1000
}

fn default_max_data_size() -> usize {
    1024 * 1024
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            label: default_label(),
            max_capacity: default_max_capacity(),
            flush_period_ms: default_flush_period_ms(),
            max_data_size: default_max_data_size(),
        }
    }
}

impl BufferSettings {
    /// Flush period as a `Duration`
    pub fn flush_period(&self) -> Duration {
        Duration::from_millis(self.flush_period_ms)
    }

    /// Validate all fields, reporting the first invalid one in declaration order.
    pub fn check(&self) -> Result<(), ContractError> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };

        let field_errors = errors.field_errors();
        for field in FIELD_ORDER {
            if let Some(first) = field_errors.get(field).and_then(|errs| errs.first()) {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                return Err(ContractError::config_validation(field, message));
            }
        }

        Err(ContractError::config_validation("settings", errors.to_string()))
    }
}
