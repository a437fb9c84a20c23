//! Persisted entities shared by the progress store backends.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::puzzle::{DigitCount, Track};

/// Terminal outcome of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptResult {
    /// The player guessed the date within the budget.
    Won,
    /// The budget was exhausted without a winning guess.
    Lost,
}

/// One persisted guess.
///
/// The value is stored twice: once in the display format the player typed,
/// once in the canonical `yyyymmdd` form, so a later format-preference
/// change never invalidates history. Feedback is recomputed on read, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessEntity {
    /// Digit string as the player typed it.
    pub display: String,
    /// Format-independent `yyyymmdd` regrouping of the same digits.
    pub canonical: String,
    /// Submission timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

/// One player's play-through record of one puzzle on one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptEntity {
    /// Primary key of the attempt.
    pub id: Uuid,
    /// Player (or device) owning the attempt.
    pub player_id: String,
    /// Puzzle the attempt belongs to.
    pub puzzle_id: Uuid,
    /// Player-visible puzzle date key, e.g. `2026-08-26`.
    pub date_key: String,
    /// Content pool of the puzzle.
    pub track: Track,
    /// Digit-count mode, locked at creation even if the player's global
    /// preference changes later.
    pub digit_count: DigitCount,
    /// Ordered, append-only guess list.
    pub guesses: Vec<GuessEntity>,
    /// Terminal result; `None` while the attempt is open.
    pub result: Option<AttemptResult>,
    /// Completion timestamp, set together with the result.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    /// Whether the attempt was played under a streak-saver session.
    pub streak_saver: bool,
    /// Creation timestamp for auditing/debugging.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AttemptEntity {
    /// Whether the attempt has reached a terminal result.
    pub fn is_finalized(&self) -> bool {
        self.result.is_some()
    }
}

/// A guess whose persistence retries were exhausted, parked for redrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryQueueItem {
    /// Attempt the guess belongs to.
    pub attempt_id: Uuid,
    /// The guess that failed to persist.
    pub guess: GuessEntity,
}

/// Identity and creation parameters for find-or-create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptKey {
    /// Player (or device) owning the attempt.
    pub player_id: String,
    /// Puzzle the attempt belongs to.
    pub puzzle_id: Uuid,
    /// Player-visible puzzle date key.
    pub date_key: String,
    /// Content pool of the puzzle.
    pub track: Track,
    /// Digit-count mode to lock in when creating.
    pub digit_count: DigitCount,
    /// Whether a streak-saver session covers this attempt.
    pub streak_saver: bool,
}

impl AttemptKey {
    /// Materialize a fresh open attempt for this key.
    pub fn create_attempt(&self, now: OffsetDateTime) -> AttemptEntity {
        AttemptEntity {
            id: Uuid::new_v4(),
            player_id: self.player_id.clone(),
            puzzle_id: self.puzzle_id,
            date_key: self.date_key.clone(),
            track: self.track,
            digit_count: self.digit_count,
            guesses: Vec::new(),
            result: None,
            completed_at: None,
            streak_saver: self.streak_saver,
            created_at: now,
        }
    }
}
