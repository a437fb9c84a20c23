//! Puzzle identity, canonical date values, and display digit formats.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, macros::format_description};
use uuid::Uuid;

/// Content pool a puzzle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Shared regional puzzle played by everyone.
    Global,
    /// Player-specific generated puzzle.
    Personalized,
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Track::Global => f.write_str("global"),
            Track::Personalized => f.write_str("personalized"),
        }
    }
}

/// Number of digits the player types for one guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitCount {
    /// Two-digit year, e.g. `200769`.
    Six,
    /// Four-digit year, e.g. `20071969`.
    Eight,
}

impl DigitCount {
    /// Length of a digit string in this mode.
    pub fn len(&self) -> usize {
        match self {
            DigitCount::Six => 6,
            DigitCount::Eight => 8,
        }
    }
}

/// Whether the day or the month comes first in the display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    /// Day, month, year.
    DayFirst,
    /// Month, day, year.
    MonthFirst,
}

/// Player-facing rendering of a date as a digit string.
///
/// The canonical storage format is always `yyyymmdd`, independent of this
/// preference, so stored guesses survive a format change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFormat {
    /// Digit count mode.
    pub digits: DigitCount,
    /// Day/month ordering.
    pub order: DateOrder,
}

/// Error raised when a digit string does not fit a display format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The string has the wrong length for the format.
    #[error("expected {expected} digits, got {got}")]
    Length {
        /// Digit count the format requires.
        expected: usize,
        /// Digit count that was provided.
        got: usize,
    },
    /// The string contains a non-digit character.
    #[error("digit strings may only contain 0-9")]
    NonDigit,
}

impl DisplayFormat {
    /// Length of a guess in this format.
    pub fn digit_len(&self) -> usize {
        self.digits.len()
    }

    /// Render a date into this format's digit string.
    pub fn render(&self, date: Date) -> String {
        let day = date.day();
        let month = u8::from(date.month());
        let year = date.year();

        let (first, second) = match self.order {
            DateOrder::DayFirst => (day, month),
            DateOrder::MonthFirst => (month, day),
        };

        match self.digits {
            DigitCount::Six => {
                format!("{first:02}{second:02}{:02}", year.rem_euclid(100))
            }
            DigitCount::Eight => format!("{first:02}{second:02}{year:04}"),
        }
    }

    /// Regroup a display digit string into the canonical `yyyymmdd` form.
    ///
    /// This is a positional transformation only; the digits are not checked
    /// for being a real calendar date, since guesses are free-form.
    pub fn to_canonical(&self, digits: &str) -> Result<String, FormatError> {
        self.check(digits)?;

        let (first, second, year_part) = (&digits[0..2], &digits[2..4], &digits[4..]);
        let (day, month) = match self.order {
            DateOrder::DayFirst => (first, second),
            DateOrder::MonthFirst => (second, first),
        };
        let year = match self.digits {
            // Two-digit years live in the 2000s, matching the display side.
            DigitCount::Six => format!("20{year_part}"),
            DigitCount::Eight => year_part.to_string(),
        };

        Ok(format!("{year}{month}{day}"))
    }

    /// Regroup a canonical `yyyymmdd` string into this format.
    pub fn from_canonical(&self, canonical: &str) -> Result<String, FormatError> {
        if canonical.len() != 8 {
            return Err(FormatError::Length {
                expected: 8,
                got: canonical.len(),
            });
        }
        if !canonical.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormatError::NonDigit);
        }

        let (year, month, day) = (&canonical[0..4], &canonical[4..6], &canonical[6..8]);
        let (first, second) = match self.order {
            DateOrder::DayFirst => (day, month),
            DateOrder::MonthFirst => (month, day),
        };

        Ok(match self.digits {
            DigitCount::Six => format!("{first}{second}{}", &year[2..4]),
            DigitCount::Eight => format!("{first}{second}{year}"),
        })
    }

    fn check(&self, digits: &str) -> Result<(), FormatError> {
        if digits.len() != self.digit_len() {
            return Err(FormatError::Length {
                expected: self.digit_len(),
                got: digits.len(),
            });
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormatError::NonDigit);
        }
        Ok(())
    }
}

impl Default for DisplayFormat {
    fn default() -> Self {
        Self {
            digits: DigitCount::Six,
            order: DateOrder::DayFirst,
        }
    }
}

/// Puzzle metadata delivered by the external allocator.
///
/// The answer content (date and format) arrives with the board; the
/// allocator-assigned identifier may resolve later, which the attempt
/// lifecycle tolerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleAnswer {
    /// Allocator-assigned identifier; may lag behind the content.
    pub id: Option<Uuid>,
    /// Canonical date value, immutable once assigned.
    pub date: Date,
    /// Display format locked to this puzzle.
    pub format: DisplayFormat,
    /// Content pool the puzzle belongs to.
    pub track: Track,
}

impl PuzzleAnswer {
    /// Answer rendered in the puzzle's display format.
    pub fn answer_digits(&self) -> String {
        self.format.render(self.date)
    }

    /// Player-visible date key, used by the anonymous device store.
    pub fn date_key(&self) -> String {
        let description = format_description!("[year]-[month]-[day]");
        self.date
            .format(&description)
            .unwrap_or_else(|_| self.date.to_string())
    }

    /// Whether this is today's instance rather than a backfill play.
    pub fn is_today(&self, today: Date) -> bool {
        self.date == today
    }
}
