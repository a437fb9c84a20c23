//! Pure per-digit feedback computation for one guess against one answer.

/// Classification of a single guessed digit against the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitState {
    /// The digit is correct at this position.
    Correct,
    /// The digit occurs elsewhere in the answer.
    InSequence,
    /// The digit does not occur anywhere in the answer.
    NotInSequence,
}

/// Hint telling the player where the true digit lies relative to the guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The answer digit at this position is numerically greater.
    Higher,
    /// The answer digit at this position is numerically smaller.
    Lower,
}

/// Feedback for one position of a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitFeedback {
    /// The guessed digit.
    pub digit: char,
    /// How the digit relates to the answer.
    pub state: DigitState,
    /// Present for every non-correct position.
    pub direction: Option<Direction>,
}

/// Score a guess against the answer, position by position.
///
/// Membership is a plain contains test against the whole answer: matched
/// occurrences are not consumed, so a repeated guess digit can claim
/// `InSequence` against a single occurrence in the answer. This leniency is
/// intentional and relied upon by the keyboard fold rules.
///
/// # Panics
///
/// Panics if the two strings differ in length or contain non-digit
/// characters. Callers validate submissions before scoring; reaching this
/// path with malformed input is a programming error, not a runtime
/// condition.
pub fn score_guess(guess: &str, answer: &str) -> Vec<DigitFeedback> {
    assert_eq!(
        guess.len(),
        answer.len(),
        "guess and answer must have the same digit count"
    );
    assert!(
        guess.bytes().chain(answer.bytes()).all(|b| b.is_ascii_digit()),
        "guess and answer must be digit strings"
    );

    guess
        .bytes()
        .zip(answer.bytes())
        .map(|(g, a)| {
            if g == a {
                return DigitFeedback {
                    digit: g as char,
                    state: DigitState::Correct,
                    direction: None,
                };
            }

            let state = if answer.as_bytes().contains(&g) {
                DigitState::InSequence
            } else {
                DigitState::NotInSequence
            };

            // ASCII order matches numeric order for digits.
            let direction = if g < a {
                Direction::Higher
            } else {
                Direction::Lower
            };

            DigitFeedback {
                digit: g as char,
                state,
                direction: Some(direction),
            }
        })
        .collect()
}

/// Whether a feedback row represents a winning guess.
pub fn is_winning(feedback: &[DigitFeedback]) -> bool {
    feedback
        .iter()
        .all(|entry| entry.state == DigitState::Correct)
}
