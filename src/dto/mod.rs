//! Typed inputs to the engine's call contract.

pub mod validation;

use validator::{Validate, ValidationErrors};

use self::validation::validate_digit_string;

/// Raw guess input as submitted by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessSubmission {
    /// Digit string the player typed, 6 or 8 characters.
    pub value: String,
}

impl Validate for GuessSubmission {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_digit_string(&self.value) {
            errors.add("value", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Modifiers attached to the play session being opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// The session is a streak-saver play: completing it preserves the
    /// player's streak despite a missed day.
    pub streak_saver: bool,
    /// Holiday mode suspends streak-breaking consequences of a loss.
    pub holiday_mode: bool,
}
