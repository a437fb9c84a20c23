//! Runtime state for the session currently being played.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::GuessEntity;
use crate::dto::SessionOptions;
use crate::feedback::DigitFeedback;
use crate::keyboard::KeyboardState;
use crate::state::state_machine::SessionStateMachine;

/// One scored guess held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guess {
    /// Digit string as the player typed it.
    pub display: String,
    /// Canonical `yyyymmdd` regrouping of the same digits.
    pub canonical: String,
    /// Per-digit feedback for this guess.
    pub feedback: Vec<DigitFeedback>,
    /// Submission timestamp.
    pub submitted_at: OffsetDateTime,
}

impl From<&Guess> for GuessEntity {
    fn from(guess: &Guess) -> Self {
        Self {
            display: guess.display.clone(),
            canonical: guess.canonical.clone(),
            submitted_at: guess.submitted_at,
        }
    }
}

/// Streak-saver modifier attached to the current play session.
///
/// Session-scoped, never part of the attempt's guess history; it only
/// changes how completion affects the externally-owned streak counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakSaverSession {
    /// Set once the terminal transition has consumed the saver.
    pub consumed: bool,
}

/// Aggregated optimistic state for the session being played.
///
/// Updated synchronously on every submission, before any network round
/// trip; persistence failures degrade durability, never this state.
#[derive(Debug, Clone)]
pub struct PlaySession {
    /// Player (or device) identifier owning the session.
    pub player_id: String,
    /// When the session was opened.
    pub started_at: OffsetDateTime,
    /// Attempt record backing this session, once resolved.
    pub attempt_id: Option<Uuid>,
    /// Guesses in submission order.
    pub guesses: Vec<Guess>,
    /// Global per-digit keyboard classification.
    pub keyboard: KeyboardState,
    /// Lifecycle state machine.
    pub machine: SessionStateMachine,
    /// Active streak-saver modifier, if any.
    pub streak_saver: Option<StreakSaverSession>,
    /// Whether holiday mode suspends streak-breaking consequences.
    pub holiday_mode: bool,
}

impl PlaySession {
    /// Open a fresh session for a player with the given modifiers.
    pub fn new(player_id: String, options: SessionOptions) -> Self {
        Self {
            player_id,
            started_at: OffsetDateTime::now_utc(),
            attempt_id: None,
            guesses: Vec::new(),
            keyboard: KeyboardState::new(),
            machine: SessionStateMachine::new(),
            streak_saver: options.streak_saver.then(StreakSaverSession::default),
            holiday_mode: options.holiday_mode,
        }
    }
}
