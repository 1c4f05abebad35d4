//! Error types for tandem-core.

use thiserror::Error;

use crate::execute::{AbortReason, RunOutput};

/// Result type for tandem-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tandem-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Executor configuration is invalid (e.g. `parallel_limit` of zero).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    /// A run was aborted before every item was processed.
    #[error("execution aborted: {0}")]
    Aborted(AbortReason),
}

impl Error {
    /// Format the error with a recovery hint for terminal output.
    pub fn with_hint(&self) -> String {
        match self {
            Self::InvalidConfig(_) => format!("{self}\n  hint: parallel limit and chunk size must be at least 1"),
            Self::Env { var, .. } => format!("{self}\n  hint: unset {var} or give it a numeric value"),
            Self::Aborted(AbortReason::Timeout) => {
                format!("{self}\n  hint: raise the timeout or lower per-item latency")
            }
            Self::Aborted(_) => self.to_string(),
        }
    }
}

/// A run stopped early because its abort handle was signalled.
///
/// Carries the slots as they stood once every worker had exited, so
/// callers can inspect progress made before the abort.
#[derive(Debug, Error)]
#[error(
    "execution aborted ({reason}): {} of {} items completed",
    .partial.completed_count(),
    .partial.len()
)]
pub struct RunAborted<U, E> {
    /// Why the run stopped.
    pub reason: AbortReason,
    /// Slots filled before the run wound down.
    pub partial: RunOutput<U, E>,
}

impl<U, E> From<RunAborted<U, E>> for Error {
    fn from(aborted: RunAborted<U, E>) -> Self {
        Self::Aborted(aborted.reason)
    }
}
