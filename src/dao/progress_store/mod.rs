//! Capability interface over the two divergent persistence surfaces.
//!
//! A session selects exactly one [`ProgressStore`] up front: the
//! authoritative remote store for authenticated players, or the anonymous
//! [`device::DeviceProgressStore`] for guests. The engine never branches on
//! authentication at individual call sites.

pub mod device;
pub mod memory;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{AttemptEntity, AttemptKey, AttemptResult, GuessEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over attempt persistence, shared by guest and authenticated
/// sessions.
pub trait ProgressStore: Send + Sync {
    /// Return the open attempt for the key, creating it if absent.
    ///
    /// Must be idempotent: find first, insert only when nothing matches, so
    /// duplicate concurrent invocations resolve to the same attempt.
    fn find_or_create_attempt(
        &self,
        key: AttemptKey,
    ) -> BoxFuture<'static, StorageResult<AttemptEntity>>;

    /// Append one guess to an open attempt's ordered list.
    fn append_guess(
        &self,
        attempt_id: Uuid,
        guess: GuessEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Set the terminal result and completion time of an attempt.
    fn finalize_attempt(
        &self,
        attempt_id: Uuid,
        result: AttemptResult,
        completed_at: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// All guesses recorded for an attempt, in submission order.
    fn list_guesses(&self, attempt_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>>;
}
