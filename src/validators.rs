//! Input validators for the registration and login surface.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AppError, ValidationError};

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address: format, length bounds, single `@`.
pub fn is_valid_email(email: &str) -> Result<String, AppError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email").into());
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH).into());
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH).into());
    }

    if trimmed.matches('@').count() != 1 || !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email has invalid format".to_string()).into());
    }

    Ok(trimmed.to_string())
}

/// Validates a display name: length bounds, no control characters.
pub fn is_valid_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("name").into());
    }

    if trimmed.len() < MIN_NAME_LENGTH {
        return Err(ValidationError::TooShort("name", MIN_NAME_LENGTH).into());
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("name", MAX_NAME_LENGTH).into());
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(
            ValidationError::InvalidFormat("name contains control characters".to_string()).into(),
        );
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails_pass() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn invalid_email_formats_fail() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());
        assert!(is_valid_email("a@a").is_err());
    }

    #[test]
    fn email_is_trimmed() {
        assert_eq!(
            is_valid_email("  user@example.com  ").unwrap(),
            "user@example.com"
        );
    }

    #[test]
    fn valid_names_pass() {
        assert!(is_valid_name("John Doe").is_ok());
        assert!(is_valid_name("Jean-Pierre").is_ok());
        assert!(is_valid_name("O'Brien").is_ok());
    }

    #[test]
    fn name_length_limits() {
        assert!(is_valid_name("J").is_err());
        assert!(is_valid_name(&"a".repeat(51)).is_err());
        assert!(is_valid_name("").is_err());
    }

    #[test]
    fn control_characters_fail() {
        assert!(is_valid_name("Name\0with\0null").is_err());
        assert!(is_valid_name("Name\twith\ttabs").is_err());
    }
}
