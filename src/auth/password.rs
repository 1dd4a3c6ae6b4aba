//! Credential hashing and verification.
//!
//! Argon2id with a per-hash random salt; the stored value is the PHC string.
//! Verification goes through the argon2 verifier, which compares in constant
//! time. Pure transform, no storage awareness.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password with a freshly generated salt.
///
/// # Errors
/// Returns an error if the password fails the length policy or hashing fails.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_length(password)?;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC-format hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Stored credential is malformed: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

fn validate_password_length(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password", MIN_PASSWORD_LENGTH).into());
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH).into());
    }

    Ok(())
}
