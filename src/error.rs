//! Error types for the memoization engine
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Errors are `Clone` so a single computation outcome can be handed to every
/// caller waiting on it.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cache was built outside a tokio runtime
    #[error("No tokio runtime available to drive the cache")]
    NoRuntime,

    /// The wrapped compute function returned an error
    #[error("Computation for key '{key}' failed: {cause:#}")]
    Computation {
        key: String,
        cause: Arc<anyhow::Error>,
    },

    /// The compute task panicked or was dropped before settling
    #[error("Computation for key '{0}' was aborted before it settled")]
    ComputationAborted(String),

    /// Inputs could not be serialized into a fingerprint
    #[error("Cannot fingerprint inputs: {0}")]
    Fingerprint(String),
}

impl CacheError {
    // == Constructors ==
    /// Wraps a compute failure for the given key.
    pub fn computation(key: impl Into<String>, cause: anyhow::Error) -> Self {
        CacheError::Computation {
            key: key.into(),
            cause: Arc::new(cause),
        }
    }

    // == Accessors ==
    /// Returns the original compute error, if this is a computation failure.
    ///
    /// Callers can `downcast_ref` the returned error to recover their own type.
    pub fn computation_cause(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::Computation { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
