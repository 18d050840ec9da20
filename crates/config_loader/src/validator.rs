//! 配置校验模块
//!
//! 校验规则：
//! - label 非空
//! - max_capacity / flush_period_ms / max_data_size > 0
//! - flush_period_ms 不超过一天

use contracts::{BufferSettings, ContractError};

/// 一天 (毫秒)
const MAX_FLUSH_PERIOD_MS: u64 = 24 * 60 * 60 * 1000;

/// 校验 BufferSettings 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(settings: &BufferSettings) -> Result<(), ContractError> {
    settings.check()?;
    validate_label(settings)?;
    validate_flush_period(settings)?;
    Ok(())
}

/// label 用作指标标签，不允许首尾空白
fn validate_label(settings: &BufferSettings) -> Result<(), ContractError> {
    if settings.label.trim() != settings.label {
        return Err(ContractError::config_validation(
            "label",
            format!("label '{}' has leading or trailing whitespace", settings.label),
        ));
    }
    Ok(())
}

fn validate_flush_period(settings: &BufferSettings) -> Result<(), ContractError> {
    if settings.flush_period_ms > MAX_FLUSH_PERIOD_MS {
        return Err(ContractError::config_validation(
            "flush_period_ms",
            format!(
                "flush_period_ms must be <= {MAX_FLUSH_PERIOD_MS}, got {}",
                settings.flush_period_ms
            ),
        ));
    }
    Ok(())
}
