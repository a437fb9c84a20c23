//! Puzzle session orchestration: guess submission, finalization side
//! effects, and replay of persisted attempts.

use time::OffsetDateTime;
use tracing::{error, info, warn};
use validator::Validate;

use crate::cache::CacheKey;
use crate::dao::models::{AttemptResult, GuessEntity};
use crate::dto::{GuessSubmission, SessionOptions};
use crate::error::EngineError;
use crate::feedback::{DigitFeedback, is_winning, score_guess};
use crate::keyboard::KeyboardState;
use crate::puzzle::PuzzleAnswer;
use crate::services::attempt_service::{resolve_attempt, resolve_attempt_id};
use crate::services::guess_service::{PersistenceStatus, persist_guess};
use crate::services::streaks::StreakMilestone;
use crate::state::session::{Guess, PlaySession};
use crate::state::{SessionEvent, SessionPhase, SessionStateMachine, SharedEngine};

/// Everything a caller needs to render one submission.
#[derive(Debug, Clone)]
pub struct GuessOutcome {
    /// Per-digit feedback for the submitted guess.
    pub feedback: Vec<DigitFeedback>,
    /// Session phase after the guess.
    pub phase: SessionPhase,
    /// Whether the guess reached durable storage.
    pub persistence: PersistenceStatus,
    /// Streak milestone to surface, present only after winning today's
    /// puzzle.
    pub milestone: Option<StreakMilestone>,
}

/// Open a fresh session for a player.
///
/// Fails if a session is already in progress; terminal sessions are
/// replaced.
pub async fn begin_session(
    engine: &SharedEngine,
    player_id: &str,
    options: SessionOptions,
) -> Result<(), EngineError> {
    let mut slot = engine.session().write().await;
    if let Some(session) = slot.as_ref() {
        if !session.machine.phase().is_terminal() {
            return Err(EngineError::InvalidState(
                "a session is already in progress".into(),
            ));
        }
    }
    *slot = Some(PlaySession::new(player_id.to_string(), options));
    Ok(())
}

/// Create or resume the persisted attempt for the active puzzle and load
/// it into a session.
///
/// Stored guesses are replayed through the feedback engine in the
/// puzzle's current display format — history is reconstructed, never
/// re-read from stored feedback.
pub async fn resume_session(
    engine: &SharedEngine,
    player_id: &str,
    options: SessionOptions,
) -> Result<SessionPhase, EngineError> {
    let attempt = resolve_attempt(engine, player_id, options.streak_saver).await?;
    let puzzle = engine
        .puzzle()
        .await
        .ok_or_else(|| EngineError::InvalidState("puzzle metadata not loaded".into()))?;

    let key = CacheKey {
        puzzle_id: attempt.puzzle_id,
        track: attempt.track,
    };
    let progress = engine
        .cache()
        .progress(key, engine.store().as_ref(), attempt.id)
        .await?;

    let guesses = replay_guesses(&progress.guesses, &puzzle)?;
    let keyboard = KeyboardState::from_guesses(guesses.iter().map(|g| g.feedback.as_slice()));
    let phase = match attempt.result {
        Some(AttemptResult::Won) => SessionPhase::Won,
        Some(AttemptResult::Lost) => SessionPhase::Lost,
        None if guesses.is_empty() => SessionPhase::NotStarted,
        None => SessionPhase::InProgress,
    };

    let mut session = PlaySession::new(player_id.to_string(), options);
    session.attempt_id = Some(attempt.id);
    session.guesses = guesses;
    session.keyboard = keyboard;
    session.machine = SessionStateMachine::resume(phase);

    let mut slot = engine.session().write().await;
    *slot = Some(session);
    Ok(phase)
}

/// Reconstruct display-format guesses and feedback from persisted
/// canonical values.
pub fn replay_guesses(
    entities: &[GuessEntity],
    puzzle: &PuzzleAnswer,
) -> Result<Vec<Guess>, EngineError> {
    let answer = puzzle.answer_digits();
    entities
        .iter()
        .map(|entity| {
            let display = puzzle.format.from_canonical(&entity.canonical)?;
            let feedback = score_guess(&display, &answer);
            Ok(Guess {
                display,
                canonical: entity.canonical.clone(),
                feedback,
                submitted_at: entity.submitted_at,
            })
        })
        .collect()
}

/// Submit one guess through the whole pipeline.
///
/// Local state (guess list, keyboard, phase) updates synchronously before
/// any I/O; attempt resolution and persistence follow and can only degrade
/// durability, never the outcome the player sees.
pub async fn submit_guess(
    engine: &SharedEngine,
    submission: GuessSubmission,
) -> Result<GuessOutcome, EngineError> {
    submission.validate()?;

    let puzzle = engine
        .puzzle()
        .await
        .ok_or_else(|| EngineError::InvalidState("puzzle metadata not loaded".into()))?;
    if submission.value.len() != puzzle.format.digit_len() {
        return Err(EngineError::InvalidInput(format!(
            "guess must have {} digits for this puzzle",
            puzzle.format.digit_len()
        )));
    }

    // Optimistic, synchronous part: score and record before any network
    // round trip.
    let (feedback, phase, player_id, streak_saver_active, entity) = {
        let mut slot = engine.session().write().await;
        let session = slot
            .as_mut()
            .ok_or_else(|| EngineError::InvalidState("no active session".into()))?;

        if session.machine.phase().is_terminal() {
            return Err(match session.attempt_id {
                Some(attempt_id) => EngineError::AttemptImmutable { attempt_id },
                None => EngineError::InvalidState("session already completed".into()),
            });
        }

        if session.machine.phase() == SessionPhase::NotStarted {
            session.machine.apply(SessionEvent::Start)?;
        }

        let answer = puzzle.answer_digits();
        let feedback = score_guess(&submission.value, &answer);
        session.keyboard.apply_guess(&feedback);

        let guess = Guess {
            display: submission.value.clone(),
            canonical: puzzle.format.to_canonical(&submission.value)?,
            feedback: feedback.clone(),
            submitted_at: OffsetDateTime::now_utc(),
        };
        let entity = GuessEntity::from(&guess);
        session.guesses.push(guess);

        let winning = is_winning(&feedback);
        let exhausted = session.guesses.len() >= engine.config().max_guesses as usize;
        let phase = session
            .machine
            .apply(SessionEvent::GuessScored { winning, exhausted })?;

        (
            feedback,
            phase,
            session.player_id.clone(),
            session.streak_saver.is_some(),
            entity,
        )
    };

    let persistence = persist_submitted_guess(
        engine,
        &puzzle,
        &player_id,
        streak_saver_active,
        entity,
    )
    .await;

    let milestone = if phase.is_terminal() {
        finalize_session(engine, &puzzle, phase).await
    } else {
        None
    };

    Ok(GuessOutcome {
        feedback,
        phase,
        persistence,
        milestone,
    })
}

/// Resolve the attempt and push the guess towards durable storage.
///
/// Every failure class here is reported, not swallowed: a guess the UI
/// shows as played must never be silently missing from the store.
async fn persist_submitted_guess(
    engine: &SharedEngine,
    puzzle: &PuzzleAnswer,
    player_id: &str,
    streak_saver: bool,
    entity: GuessEntity,
) -> PersistenceStatus {
    let attempt_id = match resolve_attempt_id(engine, player_id, streak_saver).await {
        Ok(attempt_id) => attempt_id,
        Err(err) => {
            error!(error = %err, "attempt resolution failed; guess not persisted");
            return PersistenceStatus::Failed {
                reason: err.to_string(),
            };
        }
    };

    {
        let mut slot = engine.session().write().await;
        if let Some(session) = slot.as_mut() {
            session.attempt_id = Some(attempt_id);
        }
    }

    match persist_guess(engine, attempt_id, entity.clone()).await {
        Ok(PersistenceStatus::Saved) => {
            if let Some(puzzle_id) = puzzle.id {
                let key = CacheKey {
                    puzzle_id,
                    track: puzzle.track,
                };
                engine
                    .cache()
                    .record_guess(key, engine.store().as_ref(), attempt_id, entity)
                    .await;
            }
            PersistenceStatus::Saved
        }
        Ok(status) => status,
        Err(err) => {
            error!(error = %err, "guess persistence failed hard");
            PersistenceStatus::Failed {
                reason: err.to_string(),
            }
        }
    }
}

/// Apply terminal side effects: attempt finalization, streak modifiers,
/// milestone lookup, and dependent-cache invalidation.
///
/// None of these may undo the locally visible result; failures degrade
/// cross-session continuity only and are logged as such.
async fn finalize_session(
    engine: &SharedEngine,
    puzzle: &PuzzleAnswer,
    phase: SessionPhase,
) -> Option<StreakMilestone> {
    let result = match phase {
        SessionPhase::Won => AttemptResult::Won,
        SessionPhase::Lost => AttemptResult::Lost,
        _ => return None,
    };

    let (attempt_id, streak_saver_active, holiday_mode) = {
        let slot = engine.session().read().await;
        match slot.as_ref() {
            Some(session) => (
                session.attempt_id,
                session.streak_saver.is_some(),
                session.holiday_mode,
            ),
            None => return None,
        }
    };

    if let Some(attempt_id) = attempt_id {
        if let Err(err) = engine
            .store()
            .finalize_attempt(attempt_id, result, OffsetDateTime::now_utc())
            .await
        {
            warn!(
                %attempt_id,
                error = %err,
                "attempt finalization failed; local result stands, durability degraded"
            );
        }
    }

    if streak_saver_active {
        apply_streak_saver(engine, result, holiday_mode).await;
    }

    let milestone = match result {
        AttemptResult::Won if puzzle.is_today(OffsetDateTime::now_utc().date()) => {
            match engine.streaks().statistics().await {
                Ok(stats) => {
                    info!(streak = stats.current, "surfacing streak milestone");
                    Some(StreakMilestone {
                        streak: stats.current,
                    })
                }
                Err(err) => {
                    warn!(error = %err, "streak statistics refresh failed");
                    None
                }
            }
        }
        _ => None,
    };

    if let Some(id) = puzzle.id {
        let key = CacheKey {
            puzzle_id: id,
            track: puzzle.track,
        };
        engine.cache().invalidate(key).await;
    }

    milestone
}

/// Consume the streak-saver and, on a loss, reset the streak unless
/// holiday mode suspends streak-breaking consequences.
async fn apply_streak_saver(engine: &SharedEngine, result: AttemptResult, holiday_mode: bool) {
    {
        let mut slot = engine.session().write().await;
        if let Some(session) = slot.as_mut() {
            if let Some(saver) = session.streak_saver.as_mut() {
                saver.consumed = true;
            }
        }
    }

    if let Err(err) = engine.streaks().consume_saver().await {
        warn!(error = %err, "failed to mark streak-saver consumed");
    }

    if result == AttemptResult::Lost {
        if holiday_mode {
            info!("holiday mode active; skipping streak reset on loss");
        } else if let Err(err) = engine.streaks().reset_streak().await {
            warn!(error = %err, "failed to reset streak after lost streak-saver");
        }
    }
}
