//! Backing-store error types.

use thiserror::Error;

/// Result alias for store queries.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by backing-store queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store does not support this kind of query at all.
    ///
    /// Callers treat this as a signal to take their fallback path, not as
    /// a failure.
    #[error("operation not supported by the store: {0}")]
    Unsupported(&'static str),

    /// A query was issued but failed.
    #[error("query '{operation}' failed: {message}")]
    Query {
        operation: &'static str,
        message: String,
    },

    /// No session could be opened.
    #[error("store connection failed: {0}")]
    Connection(String),
}

impl StoreError {
    pub fn query(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Query {
            operation,
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
