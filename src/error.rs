use crate::processor::ProcessorName;
use thiserror::Error;

/// The type of lifecycle hook that failed.
///
/// Used in [`ExecutorError::HookError`] to identify which hook caused the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    /// The `on_success` hook, called after an item is emitted.
    OnSuccess,
    /// The `on_failure` hook, called after an item fails for good.
    OnFailure,
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookType::OnSuccess => write!(f, "on_success"),
            HookType::OnFailure => write!(f, "on_failure"),
        }
    }
}

/// Errors that can occur while handling events.
///
/// Failures from [`CallbackExecutor::handle`](crate::CallbackExecutor::handle)
/// always leave the caller's state untouched, so any of them can be retried
/// by delivering the same event again.
///
/// # Non-Exhaustive
///
/// This enum is marked `#[non_exhaustive]`. When matching on it, always
/// include a wildcard pattern:
///
/// ```
/// use iterflow::ExecutorError;
///
/// fn report(error: ExecutorError) {
///     match error {
///         ExecutorError::Processing { processor, index, details } => {
///             eprintln!("{} failed on item {}: {}", processor, index, details);
///         }
///         ExecutorError::Timeout { processor, index } => {
///             eprintln!("{} timed out on item {}", processor, index);
///         }
///         _ => eprintln!("Error: {}", error),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The per-item processing step failed.
    #[error("Processing failed in {processor} at index {index}: {details}")]
    Processing {
        /// The processor that failed
        processor: ProcessorName,
        /// Index of the item being processed
        index: usize,
        /// Details about the failure
        details: String,
    },

    /// The per-item processing step exceeded its timeout.
    #[error("Timeout occurred in {processor} at index {index}")]
    Timeout {
        /// The processor that timed out
        processor: ProcessorName,
        /// Index of the item being processed
        index: usize,
    },

    /// The executor or driver configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An iteration state violates its invariants, usually after a restore.
    #[error("Invalid iteration state: {0}")]
    InvalidState(String),

    /// A lifecycle hook failed.
    #[error("Hook '{hook_type}' failed in processor '{processor}': {details}")]
    HookError {
        /// The processor whose hook failed
        processor: ProcessorName,
        /// Which hook failed
        hook_type: HookType,
        /// Details about the failure
        details: String,
    },

    /// A state snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
