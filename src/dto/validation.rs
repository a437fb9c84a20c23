//! Validation helpers for engine inputs.

use validator::ValidationError;

/// Validates that a guess is a digit string of a playable length (6 or 8).
///
/// Length against the active puzzle's format is checked separately at
/// submission; this guard rejects input that could never be a guess.
pub fn validate_digit_string(value: &str) -> Result<(), ValidationError> {
    if value.len() != 6 && value.len() != 8 {
        let mut err = ValidationError::new("guess_length");
        err.message =
            Some(format!("Guess must be 6 or 8 digits (got {})", value.len()).into());
        return Err(err);
    }

    if !value.bytes().all(|b| b.is_ascii_digit()) {
        let mut err = ValidationError::new("guess_format");
        err.message = Some("Guess must contain only digits 0-9".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_digit_string_valid() {
        assert!(validate_digit_string("200769").is_ok());
        assert!(validate_digit_string("20071969").is_ok());
        assert!(validate_digit_string("000000").is_ok());
    }

    #[test]
    fn test_validate_digit_string_invalid_length() {
        assert!(validate_digit_string("20076").is_err()); // too short
        assert!(validate_digit_string("2007691").is_err()); // between modes
        assert!(validate_digit_string("200719691").is_err()); // too long
        assert!(validate_digit_string("").is_err()); // empty
    }

    #[test]
    fn test_validate_digit_string_invalid_format() {
        assert!(validate_digit_string("20o769").is_err()); // letter
        assert!(validate_digit_string("20 769").is_err()); // space
        assert!(validate_digit_string("-00769").is_err()); // sign
    }
}
