//! Options validation
//!
//! Rules:
//! - max_capacity > 0
//! - flush_period > 0
//! - max_data_size > 0
//! - flush_fn and size_fn present
//!
//! Pure; usable before constructing a buffer.

use contracts::ContractError;

use crate::options::BufferOptions;

/// Validate buffer options
///
/// Returns the first violated rule, or Ok(()).
pub fn validate<I, R>(opts: &BufferOptions<I, R>) -> Result<(), ContractError> {
    validate_thresholds(opts)?;
    validate_functions(opts)?;
    Ok(())
}

fn validate_thresholds<I, R>(opts: &BufferOptions<I, R>) -> Result<(), ContractError> {
    if opts.max_capacity == 0 {
        return Err(ContractError::config_validation(
            "max_capacity",
            "max_capacity must be > 0, got 0",
        ));
    }
    if opts.flush_period.is_zero() {
        return Err(ContractError::config_validation(
            "flush_period",
            "flush_period must be > 0",
        ));
    }
    if opts.max_data_size == 0 {
        return Err(ContractError::config_validation(
            "max_data_size",
            "max_data_size must be > 0, got 0",
        ));
    }
    Ok(())
}

fn validate_functions<I, R>(opts: &BufferOptions<I, R>) -> Result<(), ContractError> {
    if opts.flush_fn.is_none() {
        return Err(ContractError::config_validation(
            "flush_fn",
            "processing function is required",
        ));
    }
    if opts.size_fn.is_none() {
        return Err(ContractError::config_validation(
            "size_fn",
            "weight function is required",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn valid_options() -> BufferOptions<u32, u32> {
        BufferOptions::new("test")
            .with_max_capacity(5)
            .with_flush_period(Duration::from_secs(1))
            .with_max_data_size(100)
            .with_flush_fn(|_cancel, items: Vec<u32>| async move { Ok::<_, contracts::BoxError>(items) })
            .with_size_fn(|_item: &u32| 1)
    }

    fn rejected_field(opts: &BufferOptions<u32, u32>) -> String {
        validate(opts)
            .unwrap_err()
            .field()
            .map(str::to_string)
            .unwrap_or_default()
    }

    #[test]
    fn test_valid_options() {
        assert!(validate(&valid_options()).is_ok());
    }

    #[test]
    fn test_zero_capacity() {
        let opts = valid_options().with_max_capacity(0);
        assert_eq!(rejected_field(&opts), "max_capacity");
    }

    #[test]
    fn test_zero_flush_period() {
        let opts = valid_options().with_flush_period(Duration::ZERO);
        assert_eq!(rejected_field(&opts), "flush_period");
    }

    #[test]
    fn test_sub_millisecond_period_accepted() {
        let opts = valid_options().with_flush_period(Duration::from_micros(500));
        assert!(validate(&opts).is_ok());
    }

    #[test]
    fn test_zero_max_data_size() {
        let opts = valid_options().with_max_data_size(0);
        assert_eq!(rejected_field(&opts), "max_data_size");
    }

    #[test]
    fn test_missing_flush_fn() {
        let mut opts = valid_options();
        opts.flush_fn = None;
        assert_eq!(rejected_field(&opts), "flush_fn");
    }

    #[test]
    fn test_missing_size_fn() {
        let mut opts = valid_options();
        opts.size_fn = None;
        assert_eq!(rejected_field(&opts), "size_fn");
    }

    #[test]
    fn test_everything_invalid() {
        let opts: BufferOptions<u32, u32> = BufferOptions::new("test")
            .with_max_capacity(0)
            .with_flush_period(Duration::ZERO)
            .with_max_data_size(0);
        let err = validate(&opts).unwrap_err();
        assert!(err.to_string().contains("must be > 0"), "got: {err}");
    }
}
