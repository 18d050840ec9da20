//! Buffer error types

use std::sync::Arc;

use thiserror::Error;

use contracts::ContractError;

/// Synchronous errors returned by `start` and `submit`
#[derive(Debug, Error)]
pub enum BufferError {
    /// Configuration rejected by the validator
    #[error("invalid buffer configuration: {0}")]
    Config(#[from] ContractError),

    /// `start` called on a buffer that was already started
    #[error("buffer '{label}' already started")]
    AlreadyStarted { label: String },

    /// Submission before `start`
    #[error("buffer '{label}' not started")]
    NotStarted { label: String },

    /// Submission after shutdown began
    #[error("buffer '{label}' stopped")]
    Stopped { label: String },

    /// `start` called outside a tokio runtime
    #[error("buffer '{label}' must be started from within a tokio runtime")]
    NoRuntime { label: String },

    /// Mailbox full (only from `try_submit`)
    #[error("mailbox full for buffer '{label}'")]
    MailboxFull { label: String },
}

impl BufferError {
    /// True for lifecycle errors (wrong state for the call)
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::AlreadyStarted { .. } | Self::NotStarted { .. } | Self::Stopped { .. }
        )
    }
}

/// Asynchronous errors delivered through response signals
///
/// Every entry of a failed batch receives a clone of the same error.
#[derive(Debug, Clone, Error)]
pub enum FlushError {
    /// The processing function returned an error
    #[error("flush failed: {0}")]
    Processor(Arc<dyn std::error::Error + Send + Sync>),

    /// The processing function returned the wrong number of results
    #[error("processor returned {actual} results for a batch of {expected}")]
    ResultCountMismatch { expected: usize, actual: usize },

    /// The processing function panicked
    #[error("processor panicked: {message}")]
    Panicked { message: String },

    /// The entry was dropped without a response
    #[error("response abandoned before delivery")]
    Abandoned,
}

impl FlushError {
    /// Wrap a processor error
    pub fn processor(err: contracts::BoxError) -> Self {
        Self::Processor(Arc::from(err))
    }

    /// The processor's own error, if this wraps one
    pub fn processor_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Processor(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
