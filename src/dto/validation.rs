//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a room code is exactly 6 ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("123456") // Ok
/// validate_room_code("12345")  // Err - too short
/// validate_room_code("12a456") // Err - not a digit
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 6 {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(format!("Room code must be exactly 6 digits (got {})", code.len()).into());
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only digits".into());
        return Err(err);
    }

    Ok(())
}
