//! Puzzle lifecycle state machine.

use thiserror::Error;

/// Phases a play session moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No guess has been submitted yet.
    NotStarted,
    /// At least one guess submitted, no terminal condition reached.
    InProgress,
    /// A guess came back all-correct. Terminal.
    Won,
    /// The guess budget was exhausted without a win. Terminal.
    Lost,
}

impl SessionPhase {
    /// Whether the phase is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Won | SessionPhase::Lost)
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The first guess of the session was accepted.
    Start,
    /// A guess was scored.
    GuessScored {
        /// The feedback row was all-correct.
        winning: bool,
        /// The guess budget is now exhausted.
        exhausted: bool,
    },
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event arrived.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine implementing the puzzle lifecycle.
///
/// Transitions apply synchronously; persistence happens afterwards and its
/// failure never rolls a phase back, since local state is the source of
/// truth for the running session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::NotStarted,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine in the not-started phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state machine at a known phase, e.g. when resuming a
    /// persisted attempt.
    pub fn resume(phase: SessionPhase) -> Self {
        Self { phase }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Apply an event, moving to the next phase.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        self.phase = self.compute_transition(event)?;
        Ok(self.phase)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::NotStarted, SessionEvent::Start) => SessionPhase::InProgress,
            (SessionPhase::InProgress, SessionEvent::GuessScored { winning: true, .. }) => {
                SessionPhase::Won
            }
            (
                SessionPhase::InProgress,
                SessionEvent::GuessScored {
                    winning: false,
                    exhausted: true,
                },
            ) => SessionPhase::Lost,
            (
                SessionPhase::InProgress,
                SessionEvent::GuessScored {
                    winning: false,
                    exhausted: false,
                },
            ) => SessionPhase::InProgress,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
