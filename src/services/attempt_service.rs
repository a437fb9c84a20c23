//! Idempotent create-or-resume of the attempt record backing a session.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::models::{AttemptEntity, AttemptKey};
use crate::error::EngineError;
use crate::puzzle::PuzzleAnswer;
use crate::state::SharedEngine;

/// Resolve the attempt identifier for the active puzzle without touching
/// the store when this session has already resolved it.
///
/// The session-scoped idempotency map short-circuits repeat submissions;
/// only the first call per (puzzle, track) pays for the round trip.
pub async fn resolve_attempt_id(
    engine: &SharedEngine,
    player_id: &str,
    streak_saver: bool,
) -> Result<Uuid, EngineError> {
    let puzzle = await_puzzle_identity(engine).await?;
    if let Some(puzzle_id) = puzzle.id {
        if let Some(attempt_id) = engine.cached_attempt_id(puzzle_id, puzzle.track) {
            debug!(%attempt_id, "attempt already resolved in this session");
            return Ok(attempt_id);
        }
    }
    Ok(resolve_attempt(engine, player_id, streak_saver).await?.id)
}

/// Resolve the full attempt record for the active puzzle.
///
/// Waits for the puzzle identifier if metadata has not finished loading,
/// through the configured backoff schedule — exhaustion is a hard,
/// reported failure, never a silent fall-through to guest behavior. The
/// store-side find-or-create is idempotent and retried on transient
/// failure, so duplicate concurrent invocations converge on the same
/// attempt.
pub async fn resolve_attempt(
    engine: &SharedEngine,
    player_id: &str,
    streak_saver: bool,
) -> Result<AttemptEntity, EngineError> {
    let puzzle = await_puzzle_identity(engine).await?;
    // `await_puzzle_identity` only returns puzzles with an id.
    let puzzle_id = puzzle.id.ok_or(EngineError::InvalidState(
        "puzzle identity resolved without an id".into(),
    ))?;

    let key = AttemptKey {
        player_id: player_id.to_string(),
        puzzle_id,
        date_key: puzzle.date_key(),
        track: puzzle.track,
        digit_count: puzzle.format.digits,
        streak_saver,
    };

    let store = engine.store().clone();
    let attempt = engine
        .config()
        .resolve_policy()
        .run("resolve attempt", || {
            let store = store.clone();
            let key = key.clone();
            async move { store.find_or_create_attempt(key).await }
        })
        .await
        .map_err(|err| {
            warn!(%puzzle_id, attempts = err.attempts, error = %err.last, "attempt resolution exhausted its retries");
            EngineError::from(err)
        })?;

    engine.remember_attempt_id(puzzle_id, puzzle.track, attempt.id);
    Ok(attempt)
}

/// Wait for the puzzle identifier to arrive, polling through the metadata
/// backoff schedule.
async fn await_puzzle_identity(engine: &SharedEngine) -> Result<PuzzleAnswer, EngineError> {
    let policy = engine.config().metadata_policy();
    let attempts = policy.attempts();

    policy
        .run("await puzzle identity", || async {
            match engine.puzzle().await {
                Some(puzzle) if puzzle.id.is_some() => Ok(puzzle),
                _ => Err(PuzzleNotReady),
            }
        })
        .await
        .map_err(|_| {
            warn!(attempts, "puzzle identity never arrived; failing the operation loudly");
            EngineError::PuzzleUnavailable { attempts }
        })
}

#[derive(Debug)]
struct PuzzleNotReady;

impl std::fmt::Display for PuzzleNotReady {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("puzzle identifier not yet available")
    }
}
