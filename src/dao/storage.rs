//! Errors shared by every progress store backend.

use std::error::Error;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transient backend failure; safe to retry.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable description of the failure.
        message: String,
        /// Underlying backend error, when one exists.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    /// The referenced attempt does not exist in this backend.
    #[error("attempt `{attempt_id}` not found")]
    NotFound {
        /// Identifier that failed to resolve.
        attempt_id: Uuid,
    },
    /// The attempt has a terminal result and its history is immutable.
    #[error("attempt `{attempt_id}` is finalized and cannot be modified")]
    Finalized {
        /// Identifier of the finalized attempt.
        attempt_id: Uuid,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Unavailable error with no underlying cause, e.g. injected outages.
    pub fn transient(message: impl Into<String>) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: None,
        }
    }
}
