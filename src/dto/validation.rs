//! Validation helpers for DTOs.

use validator::ValidationError;

/// Upper bound on a single petit-bac answer, in characters.
pub const MAX_ANSWER_CHARS: usize = 100;

/// Rejects values made only of whitespace. Length bounds are checked by the derive.
///
/// # Examples
///
/// ```ignore
/// validate_not_blank("alice") // Ok
/// validate_not_blank("   ")   // Err
/// ```
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must contain at least one visible character".into());
        return Err(err);
    }
    Ok(())
}

/// Petit-bac answers may be empty (category left blank) but not oversized.
pub fn validate_answer_text(text: &str) -> Result<(), ValidationError> {
    let count = text.chars().count();
    if count > MAX_ANSWER_CHARS {
        let mut err = ValidationError::new("answer_length");
        err.message = Some(
            format!("Answer must be at most {MAX_ANSWER_CHARS} characters (got {count})").into(),
        );
        return Err(err);
    }
    Ok(())
}
