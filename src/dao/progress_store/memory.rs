//! In-memory progress store, the authoritative stand-in for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{AttemptEntity, AttemptKey, AttemptResult, GuessEntity};
use crate::dao::storage::{StorageError, StorageResult};
use crate::puzzle::Track;

type IndexKey = (String, Uuid, Track);

#[derive(Default)]
struct Inner {
    attempts: DashMap<Uuid, AttemptEntity>,
    index: DashMap<IndexKey, Uuid>,
    fail_budget: AtomicU32,
}

/// Progress store holding everything in process memory.
///
/// Supports injecting a bounded number of transient failures so retry and
/// exhaustion paths can be exercised deterministically.
#[derive(Clone, Default)]
pub struct MemoryProgressStore {
    inner: Arc<Inner>,
}

impl MemoryProgressStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` operations fail with a transient error.
    pub fn fail_next(&self, count: u32) {
        self.inner.fail_budget.store(count, Ordering::SeqCst);
    }

    /// Number of attempts currently stored.
    pub fn attempt_count(&self) -> usize {
        self.inner.attempts.len()
    }

    /// Fetch a stored attempt by id.
    pub fn attempt(&self, attempt_id: Uuid) -> Option<AttemptEntity> {
        self.inner.attempts.get(&attempt_id).map(|a| a.clone())
    }

    fn take_failure(inner: &Inner) -> Option<StorageError> {
        let budget = inner.fail_budget.load(Ordering::SeqCst);
        if budget == 0 {
            return None;
        }
        inner.fail_budget.store(budget - 1, Ordering::SeqCst);
        Some(StorageError::transient("injected outage"))
    }
}

impl super::ProgressStore for MemoryProgressStore {
    fn find_or_create_attempt(
        &self,
        key: AttemptKey,
    ) -> BoxFuture<'static, StorageResult<AttemptEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if let Some(err) = Self::take_failure(&inner) {
                return Err(err);
            }

            let index_key = (key.player_id.clone(), key.puzzle_id, key.track);
            // Find first; entry() makes concurrent creation race-free.
            let id = *inner
                .index
                .entry(index_key)
                .or_insert_with(|| {
                    let attempt = key.create_attempt(OffsetDateTime::now_utc());
                    let id = attempt.id;
                    inner.attempts.insert(id, attempt);
                    id
                })
                .value();

            inner
                .attempts
                .get(&id)
                .map(|attempt| attempt.clone())
                .ok_or(StorageError::NotFound { attempt_id: id })
        })
    }

    fn append_guess(
        &self,
        attempt_id: Uuid,
        guess: GuessEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if let Some(err) = Self::take_failure(&inner) {
                return Err(err);
            }

            let mut attempt = inner
                .attempts
                .get_mut(&attempt_id)
                .ok_or(StorageError::NotFound { attempt_id })?;
            if attempt.is_finalized() {
                return Err(StorageError::Finalized { attempt_id });
            }
            attempt.guesses.push(guess);
            Ok(())
        })
    }

    fn finalize_attempt(
        &self,
        attempt_id: Uuid,
        result: AttemptResult,
        completed_at: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if let Some(err) = Self::take_failure(&inner) {
                return Err(err);
            }

            let mut attempt = inner
                .attempts
                .get_mut(&attempt_id)
                .ok_or(StorageError::NotFound { attempt_id })?;
            if attempt.is_finalized() {
                return Err(StorageError::Finalized { attempt_id });
            }
            attempt.result = Some(result);
            attempt.completed_at = Some(completed_at);
            Ok(())
        })
    }

    fn list_guesses(&self, attempt_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if let Some(err) = Self::take_failure(&inner) {
                return Err(err);
            }

            inner
                .attempts
                .get(&attempt_id)
                .map(|attempt| attempt.guesses.clone())
                .ok_or(StorageError::NotFound { attempt_id })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::progress_store::ProgressStore;
    use crate::puzzle::DigitCount;

    fn key(player: &str, puzzle_id: Uuid, track: Track) -> AttemptKey {
        AttemptKey {
            player_id: player.into(),
            puzzle_id,
            date_key: "2026-08-26".into(),
            track,
            digit_count: DigitCount::Six,
            streak_saver: false,
        }
    }

    fn guess(value: &str) -> GuessEntity {
        GuessEntity {
            display: value.into(),
            canonical: format!("20{}{}{}", &value[4..6], &value[2..4], &value[0..2]),
            submitted_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let store = MemoryProgressStore::new();
        let puzzle_id = Uuid::new_v4();

        let first = store
            .find_or_create_attempt(key("p1", puzzle_id, Track::Global))
            .await
            .unwrap();
        let second = store
            .find_or_create_attempt(key("p1", puzzle_id, Track::Global))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.attempt_count(), 1);
    }

    #[tokio::test]
    async fn tracks_resolve_to_distinct_attempts() {
        let store = MemoryProgressStore::new();
        let puzzle_id = Uuid::new_v4();

        let global = store
            .find_or_create_attempt(key("p1", puzzle_id, Track::Global))
            .await
            .unwrap();
        let personalized = store
            .find_or_create_attempt(key("p1", puzzle_id, Track::Personalized))
            .await
            .unwrap();

        assert_ne!(global.id, personalized.id);
    }

    #[tokio::test]
    async fn finalized_attempts_reject_mutation() {
        let store = MemoryProgressStore::new();
        let attempt = store
            .find_or_create_attempt(key("p1", Uuid::new_v4(), Track::Global))
            .await
            .unwrap();

        store
            .finalize_attempt(attempt.id, AttemptResult::Won, OffsetDateTime::now_utc())
            .await
            .unwrap();

        let err = store.append_guess(attempt.id, guess("200769")).await;
        assert!(matches!(err, Err(StorageError::Finalized { .. })));

        let err = store
            .finalize_attempt(attempt.id, AttemptResult::Lost, OffsetDateTime::now_utc())
            .await;
        assert!(matches!(err, Err(StorageError::Finalized { .. })));
    }

    #[tokio::test]
    async fn guesses_are_listed_in_submission_order() {
        let store = MemoryProgressStore::new();
        let attempt = store
            .find_or_create_attempt(key("p1", Uuid::new_v4(), Track::Global))
            .await
            .unwrap();

        store.append_guess(attempt.id, guess("111111")).await.unwrap();
        store.append_guess(attempt.id, guess("250769")).await.unwrap();

        let listed = store.list_guesses(attempt.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].display, "111111");
        assert_eq!(listed[1].display, "250769");
    }

    #[tokio::test]
    async fn injected_failures_are_transient() {
        let store = MemoryProgressStore::new();
        store.fail_next(1);

        let err = store
            .find_or_create_attempt(key("p1", Uuid::new_v4(), Track::Global))
            .await;
        assert!(matches!(err, Err(StorageError::Unavailable { .. })));

        // Budget consumed; the next call succeeds.
        store
            .find_or_create_attempt(key("p1", Uuid::new_v4(), Track::Global))
            .await
            .unwrap();
    }
}
