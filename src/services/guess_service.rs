//! Guess persistence with bounded retry and a redriveable fallback queue.

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dao::models::{GuessEntity, RetryQueueItem};
use crate::dao::storage::StorageError;
use crate::error::EngineError;
use crate::state::SharedEngine;

/// How a guess submission fared against durable storage.
///
/// Gameplay never blocks on this outcome; the caller logs and surfaces it,
/// and the player keeps guessing either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    /// The guess reached the progress store.
    Saved,
    /// Retries were exhausted; the guess is parked in the retry queue.
    Queued {
        /// Queue depth after parking this guess.
        pending: usize,
    },
    /// The attempt itself could not be resolved; nothing was persisted.
    Failed {
        /// Why persistence never started.
        reason: String,
    },
}

/// Persist one guess, retrying through the configured backoff schedule.
///
/// Queued predecessors for the same attempt are redriven first so the
/// store always sees guesses in submission order. On exhaustion the guess
/// joins the queue and the failure is reported distinctly — never silently
/// treated as saved.
///
/// Mutating a finalized attempt is a hard error, not a queueable outcome.
pub async fn persist_guess(
    engine: &SharedEngine,
    attempt_id: Uuid,
    guess: GuessEntity,
) -> Result<PersistenceStatus, EngineError> {
    redrive_attempt(engine, attempt_id).await;

    if pending_for(engine, attempt_id).await > 0 {
        // Predecessors are still stuck; appending now would reorder.
        return Ok(park(engine, attempt_id, guess).await);
    }

    let store = engine.store().clone();
    let outcome = engine
        .config()
        .persist_policy()
        .run("persist guess", || {
            let store = store.clone();
            let guess = guess.clone();
            async move { store.append_guess(attempt_id, guess).await }
        })
        .await;

    match outcome {
        Ok(()) => Ok(PersistenceStatus::Saved),
        Err(exhausted) => match exhausted.last {
            StorageError::Finalized { attempt_id } => {
                Err(EngineError::AttemptImmutable { attempt_id })
            }
            last => {
                error!(
                    %attempt_id,
                    attempts = exhausted.attempts,
                    error = %last,
                    "guess persistence exhausted its retries; parking for redrive"
                );
                Ok(park(engine, attempt_id, guess).await)
            }
        },
    }
}

/// Redrive every queued guess, across attempts, in FIFO order.
///
/// Returns the number of items that reached the store. A transient failure
/// re-parks the item and stops the pass so submission order is preserved
/// for everything behind it. Permanent failures (finalized or vanished
/// attempts) can never succeed on a later pass; those items are dropped
/// with a loud error so one poison guess cannot wedge the queue for
/// healthy attempts behind it.
pub async fn redrive(engine: &SharedEngine) -> usize {
    let mut drained = 0;

    loop {
        let item = {
            let mut queue = engine.pending_guesses().lock().await;
            match queue.pop_front() {
                Some(item) => item,
                None => break,
            }
        };

        match engine
            .store()
            .append_guess(item.attempt_id, item.guess.clone())
            .await
        {
            Ok(()) => {
                info!(attempt_id = %item.attempt_id, "redrove queued guess");
                drained += 1;
            }
            Err(err @ StorageError::Unavailable { .. }) => {
                warn!(attempt_id = %item.attempt_id, error = %err, "redrive stopped; re-parking item");
                let mut queue = engine.pending_guesses().lock().await;
                queue.push_front(item);
                break;
            }
            Err(err) => {
                error!(
                    attempt_id = %item.attempt_id,
                    display = %item.guess.display,
                    error = %err,
                    "dropping queued guess that can never persist"
                );
            }
        }
    }

    drained
}

/// Number of queued guesses across all attempts.
pub async fn pending(engine: &SharedEngine) -> usize {
    engine.pending_guesses().lock().await.len()
}

async fn redrive_attempt(engine: &SharedEngine, attempt_id: Uuid) {
    if pending_for(engine, attempt_id).await > 0 {
        let drained = redrive(engine).await;
        if drained > 0 {
            info!(%attempt_id, drained, "opportunistic redrive before new persist");
        }
    }
}

async fn pending_for(engine: &SharedEngine, attempt_id: Uuid) -> usize {
    engine
        .pending_guesses()
        .lock()
        .await
        .iter()
        .filter(|item| item.attempt_id == attempt_id)
        .count()
}

async fn park(engine: &SharedEngine, attempt_id: Uuid, guess: GuessEntity) -> PersistenceStatus {
    let mut queue = engine.pending_guesses().lock().await;
    queue.push_back(RetryQueueItem { attempt_id, guess });
    PersistenceStatus::Queued {
        pending: queue.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryCacheStore;
    use crate::config::EngineConfig;
    use crate::dao::models::{AttemptKey, AttemptResult};
    use crate::dao::progress_store::ProgressStore;
    use crate::dao::progress_store::memory::MemoryProgressStore;
    use crate::puzzle::{DigitCount, Track};
    use crate::services::streaks::MemoryStreakTracker;
    use crate::state::EngineState;
    use std::sync::Arc;
    use std::time::Duration;
    use time::OffsetDateTime;

    fn engine_with(store: MemoryProgressStore) -> SharedEngine {
        EngineState::new(
            EngineConfig {
                persist_backoff: vec![Duration::ZERO; 2],
                ..EngineConfig::default()
            },
            Arc::new(store),
            Arc::new(MemoryCacheStore::new()),
            Arc::new(MemoryStreakTracker::default()),
        )
    }

    async fn open_attempt(store: &MemoryProgressStore) -> Uuid {
        store
            .find_or_create_attempt(AttemptKey {
                player_id: "p1".into(),
                puzzle_id: Uuid::new_v4(),
                date_key: "2026-08-26".into(),
                track: Track::Global,
                digit_count: DigitCount::Six,
                streak_saver: false,
            })
            .await
            .unwrap()
            .id
    }

    fn guess(value: &str) -> GuessEntity {
        GuessEntity {
            display: value.into(),
            canonical: "20260826".into(),
            submitted_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn saves_on_first_try() {
        let store = MemoryProgressStore::new();
        let engine = engine_with(store.clone());
        let attempt_id = open_attempt(&store).await;

        let status = persist_guess(&engine, attempt_id, guess("200769"))
            .await
            .unwrap();
        assert_eq!(status, PersistenceStatus::Saved);
        assert_eq!(store.attempt(attempt_id).unwrap().guesses.len(), 1);
    }

    #[tokio::test]
    async fn recovers_within_the_retry_budget() {
        let store = MemoryProgressStore::new();
        let engine = engine_with(store.clone());
        let attempt_id = open_attempt(&store).await;

        store.fail_next(2);
        let status = persist_guess(&engine, attempt_id, guess("200769"))
            .await
            .unwrap();
        assert_eq!(status, PersistenceStatus::Saved);
    }

    #[tokio::test]
    async fn exhaustion_parks_the_guess_and_reports_it() {
        let store = MemoryProgressStore::new();
        let engine = engine_with(store.clone());
        let attempt_id = open_attempt(&store).await;

        store.fail_next(3);
        let status = persist_guess(&engine, attempt_id, guess("200769"))
            .await
            .unwrap();
        assert_eq!(status, PersistenceStatus::Queued { pending: 1 });
        assert!(store.attempt(attempt_id).unwrap().guesses.is_empty());
    }

    #[tokio::test]
    async fn redrive_preserves_submission_order() {
        let store = MemoryProgressStore::new();
        let engine = engine_with(store.clone());
        let attempt_id = open_attempt(&store).await;

        store.fail_next(3);
        persist_guess(&engine, attempt_id, guess("111111")).await.unwrap();
        assert_eq!(pending(&engine).await, 1);

        // Storage is healthy again: the queued guess goes first, then the
        // new one, keeping submission order.
        let status = persist_guess(&engine, attempt_id, guess("250769"))
            .await
            .unwrap();
        assert_eq!(status, PersistenceStatus::Saved);
        assert_eq!(pending(&engine).await, 0);

        let stored = store.attempt(attempt_id).unwrap().guesses;
        assert_eq!(stored[0].display, "111111");
        assert_eq!(stored[1].display, "250769");
    }

    #[tokio::test]
    async fn new_guesses_queue_behind_stuck_predecessors() {
        let store = MemoryProgressStore::new();
        let engine = engine_with(store.clone());
        let attempt_id = open_attempt(&store).await;

        store.fail_next(3);
        persist_guess(&engine, attempt_id, guess("111111")).await.unwrap();

        // Still down: the follow-up must not jump the queue.
        store.fail_next(10);
        let status = persist_guess(&engine, attempt_id, guess("250769"))
            .await
            .unwrap();
        assert_eq!(status, PersistenceStatus::Queued { pending: 2 });

        store.fail_next(0);
        assert_eq!(redrive(&engine).await, 2);
        let stored = store.attempt(attempt_id).unwrap().guesses;
        assert_eq!(stored[0].display, "111111");
        assert_eq!(stored[1].display, "250769");
    }

    #[tokio::test]
    async fn queued_guess_for_a_finalized_attempt_does_not_block_others() {
        let store = MemoryProgressStore::new();
        let engine = engine_with(store.clone());
        let doomed = open_attempt(&store).await;
        let healthy = {
            store
                .find_or_create_attempt(AttemptKey {
                    player_id: "p2".into(),
                    puzzle_id: Uuid::new_v4(),
                    date_key: "2026-08-26".into(),
                    track: Track::Global,
                    digit_count: DigitCount::Six,
                    streak_saver: false,
                })
                .await
                .unwrap()
                .id
        };

        // Both guesses park during an outage; the first attempt is then
        // finalized elsewhere, so its queued guess can never persist.
        store.fail_next(3);
        persist_guess(&engine, doomed, guess("111111")).await.unwrap();
        store
            .finalize_attempt(doomed, AttemptResult::Won, OffsetDateTime::now_utc())
            .await
            .unwrap();
        store.fail_next(3);
        persist_guess(&engine, healthy, guess("250769")).await.unwrap();
        assert_eq!(pending(&engine).await, 2);

        // Storage is healthy again: the poison item is dropped, the one
        // behind it still lands.
        assert_eq!(redrive(&engine).await, 1);
        assert_eq!(pending(&engine).await, 0);
        assert!(store.attempt(doomed).unwrap().guesses.is_empty());
        assert_eq!(store.attempt(healthy).unwrap().guesses.len(), 1);
    }

    #[tokio::test]
    async fn finalized_attempt_is_a_hard_error() {
        let store = MemoryProgressStore::new();
        let engine = engine_with(store.clone());
        let attempt_id = open_attempt(&store).await;
        store
            .finalize_attempt(attempt_id, AttemptResult::Won, OffsetDateTime::now_utc())
            .await
            .unwrap();

        let err = persist_guess(&engine, attempt_id, guess("200769"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AttemptImmutable { .. }));
        assert_eq!(pending(&engine).await, 0);
    }
}
