//! Global per-digit keyboard classification folded from guess feedback.

use indexmap::IndexMap;

use crate::feedback::{DigitFeedback, DigitState};

/// Keyboard coloring for a digit key, derived from every guess so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// The digit has been confirmed correct in at least one position.
    Correct,
    /// The digit occurs in the answer but has not been placed correctly.
    InSequence,
    /// The digit has been ruled out of the answer.
    RuledOut,
}

/// Per-digit key states in first-touched order.
///
/// Digits that have never appeared in a guess carry no state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardState {
    keys: IndexMap<char, KeyState>,
}

impl KeyboardState {
    /// Empty keyboard with no digit touched yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a digit key, if any guess has touched it.
    pub fn get(&self, digit: char) -> Option<KeyState> {
        self.keys.get(&digit).copied()
    }

    /// Fold a single digit's feedback into the keyboard.
    ///
    /// `Correct` is written unconditionally and never downgrades; the other
    /// states only apply while the key has not been confirmed correct.
    pub fn fold(&mut self, digit: char, state: DigitState) {
        match state {
            DigitState::Correct => {
                self.keys.insert(digit, KeyState::Correct);
            }
            DigitState::InSequence => {
                if self.get(digit) != Some(KeyState::Correct) {
                    self.keys.insert(digit, KeyState::InSequence);
                }
            }
            DigitState::NotInSequence => {
                if self.get(digit) != Some(KeyState::Correct) {
                    self.keys.insert(digit, KeyState::RuledOut);
                }
            }
        }
    }

    /// Fold an entire guess row, digit by digit, in position order.
    pub fn apply_guess(&mut self, feedback: &[DigitFeedback]) {
        for entry in feedback {
            self.fold(entry.digit, entry.state);
        }
    }

    /// Rebuild the keyboard from a guess history in submission order.
    pub fn from_guesses<'a, I>(guesses: I) -> Self
    where
        I: IntoIterator<Item = &'a [DigitFeedback]>,
    {
        let mut keyboard = Self::new();
        for feedback in guesses {
            keyboard.apply_guess(feedback);
        }
        keyboard
    }

    /// Iterate over touched keys in first-touched order.
    pub fn iter(&self) -> impl Iterator<Item = (char, KeyState)> + '_ {
        self.keys.iter().map(|(digit, state)| (*digit, *state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::score_guess;

    #[test]
    fn untouched_digit_has_no_state() {
        let keyboard = KeyboardState::new();
        assert_eq!(keyboard.get('7'), None);
    }

    #[test]
    fn fold_applies_feedback_states() {
        let mut keyboard = KeyboardState::new();
        keyboard.fold('1', DigitState::Correct);
        keyboard.fold('2', DigitState::InSequence);
        keyboard.fold('3', DigitState::NotInSequence);

        assert_eq!(keyboard.get('1'), Some(KeyState::Correct));
        assert_eq!(keyboard.get('2'), Some(KeyState::InSequence));
        assert_eq!(keyboard.get('3'), Some(KeyState::RuledOut));
    }

    #[test]
    fn correct_never_downgrades() {
        let mut keyboard = KeyboardState::new();
        keyboard.fold('4', DigitState::Correct);
        keyboard.fold('4', DigitState::InSequence);
        assert_eq!(keyboard.get('4'), Some(KeyState::Correct));
        keyboard.fold('4', DigitState::NotInSequence);
        assert_eq!(keyboard.get('4'), Some(KeyState::Correct));
    }

    #[test]
    fn in_sequence_upgrades_to_correct() {
        let mut keyboard = KeyboardState::new();
        keyboard.fold('8', DigitState::InSequence);
        keyboard.fold('8', DigitState::Correct);
        assert_eq!(keyboard.get('8'), Some(KeyState::Correct));
    }

    #[test]
    fn rebuild_from_history_matches_incremental_fold() {
        let answer = "200769";
        let rows = [score_guess("111111", answer), score_guess("250769", answer)];

        let mut incremental = KeyboardState::new();
        for row in &rows {
            incremental.apply_guess(row);
        }

        let rebuilt = KeyboardState::from_guesses(rows.iter().map(Vec::as_slice));
        assert_eq!(incremental, rebuilt);
        // 1 is ruled out, 2 was placed correctly on the second guess.
        assert_eq!(rebuilt.get('1'), Some(KeyState::RuledOut));
        assert_eq!(rebuilt.get('2'), Some(KeyState::Correct));
    }
}
