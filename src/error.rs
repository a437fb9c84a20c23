//! Engine-level error taxonomy.

use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;
use crate::puzzle::FormatError;
use crate::retry::Exhausted;
use crate::state::state_machine::InvalidTransition;

/// Errors surfaced by the engine's service operations.
///
/// Persistence failures that gameplay tolerates are not errors here; they
/// travel in the submission outcome so callers cannot mistake "saved" for
/// "queued". This enum covers the cases a caller must handle.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Storage backend failed and retries were exhausted.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the caller; rejected before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current session state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Puzzle identity never arrived despite waiting through the backoff
    /// schedule; the guess cannot be persisted and must not be dropped
    /// silently.
    #[error("puzzle metadata unavailable after {attempts} attempts")]
    PuzzleUnavailable {
        /// Number of waits performed before giving up.
        attempts: usize,
    },
    /// The attempt already carries a terminal result; its history is
    /// immutable.
    #[error("attempt `{attempt_id}` is finalized")]
    AttemptImmutable {
        /// Identifier of the finalized attempt.
        attempt_id: Uuid,
    },
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Finalized { attempt_id } => EngineError::AttemptImmutable { attempt_id },
            other => EngineError::Unavailable(other),
        }
    }
}

impl From<Exhausted<StorageError>> for EngineError {
    fn from(err: Exhausted<StorageError>) -> Self {
        EngineError::from(err.last)
    }
}

impl From<InvalidTransition> for EngineError {
    fn from(err: InvalidTransition) -> Self {
        EngineError::InvalidState(err.to_string())
    }
}

impl From<ValidationErrors> for EngineError {
    fn from(err: ValidationErrors) -> Self {
        EngineError::InvalidInput(format!("validation failed: {err}"))
    }
}

impl From<FormatError> for EngineError {
    fn from(err: FormatError) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}
