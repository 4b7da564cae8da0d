//! Error types for the bindjoin workspace.
//!
//! Failed merges and hash-bucket misses are ordinary control flow and are
//! never represented here. Only contract violations, cancellation, predicate
//! evaluation failures and configuration problems become a [`JoinError`].

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type Result<T, E = JoinError> = std::result::Result<T, E>;

/// Every error a join pipeline can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// A row was inserted into a probe table after lookups had started.
    #[error("probe table is finalized: rows cannot be added after the first lookup")]
    TableFinalized,

    /// `next_binding` was called on an iterator with nothing left.
    #[error("iterator exhausted: next_binding called with no binding available")]
    Exhausted,

    /// The iterator was cancelled before this step was requested.
    #[error("join execution cancelled")]
    Cancelled,

    /// A filter predicate failed to evaluate.
    #[error("expression evaluation failed: {message}")]
    Eval { message: String },

    /// Configuration could not be parsed or is inconsistent.
    #[error("invalid join configuration: {message}")]
    Config { message: String },

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JoinError {
    /// Build an [`JoinError::Internal`] from any message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Build an [`JoinError::Eval`] from any message.
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }

    /// Build a [`JoinError::Config`] from any message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error reports a caller contract violation.
    ///
    /// Usage errors point at a logic bug in the calling code path and are
    /// never recovered from inside the join core.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(self, Self::TableFinalized | Self::Exhausted)
    }
}
