//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest nickname accepted, in characters, after trimming.
pub const NICKNAME_MAX_CHARS: usize = 20;

/// Validates that a nickname has between 1 and [`NICKNAME_MAX_CHARS`] visible characters.
///
/// # Examples
///
/// ```ignore
/// validate_nickname("ember")     // Ok
/// validate_nickname("   ")       // Err - blank
/// validate_nickname("a\u{7}b")   // Err - control character
/// ```
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let trimmed = nickname.trim();
    let length = trimmed.chars().count();
    if length == 0 || length > NICKNAME_MAX_CHARS {
        let mut err = ValidationError::new("nickname_length");
        err.message = Some(
            format!("Nickname must be 1 to {NICKNAME_MAX_CHARS} characters (got {length})").into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("nickname_format");
        err.message = Some("Nickname must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a submitted word is not blank once trimmed.
pub fn validate_word(word: &str) -> Result<(), ValidationError> {
    if word.trim().is_empty() {
        let mut err = ValidationError::new("word_blank");
        err.message = Some("Word must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_nickname_valid() {
        assert!(validate_nickname("ember").is_ok());
        assert!(validate_nickname("  padded  ").is_ok());
        assert!(validate_nickname("ÉlodieÉlodieÉlodie").is_ok());
    }

    #[test]
    fn test_validate_nickname_invalid_length() {
        assert!(validate_nickname("").is_err());
        assert!(validate_nickname("    ").is_err());
        assert!(validate_nickname("abcdefghijklmnopqrstu").is_err()); // 21 chars
    }

    #[test]
    fn test_validate_nickname_invalid_format() {
        assert!(validate_nickname("a\u{7}b").is_err());
        assert!(validate_nickname("tab\there").is_err());
    }

    #[test]
    fn test_validate_word() {
        assert!(validate_word("flame").is_ok());
        assert!(validate_word(" \t ").is_err());
    }
}
