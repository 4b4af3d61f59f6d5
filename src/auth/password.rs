/// Password Hashing and Verification
///
/// Salted one-way hashing with bcrypt. Every digest embeds its own salt
/// and cost, so hashing the same password twice yields different digests.
/// bcrypt only reads the first 72 bytes of its input, so longer passwords
/// are refused outright instead of being truncated.

use bcrypt::{hash, verify};
use thiserror::Error;

use crate::error::AuthError;

/// bcrypt cost factor. Each increment doubles the work per hash.
pub const PASSWORD_COST: u32 = 12;

const MIN_PASSWORD_LENGTH: usize = 8;
/// Longest password bcrypt consumes in full, in bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Reasons a candidate password is refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("password is too short (minimum {0} characters)")]
    TooShort(usize),
    #[error("password is too long (maximum {0} bytes)")]
    TooLong(usize),
    #[error("password must contain at least one digit, one lowercase letter, and one uppercase letter")]
    MissingCharacterClass,
}

/// Hash a password using bcrypt
///
/// # Errors
/// - `PasswordTooLong` if the password exceeds [`MAX_PASSWORD_BYTES`]
/// - `Hashing` if bcrypt fails
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::PasswordTooLong(MAX_PASSWORD_BYTES));
    }
    hash(password, PASSWORD_COST).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a password against its digest
///
/// A malformed digest counts as a mismatch, and so does a password that
/// could never have been hashed.
pub fn verify_password(password: &str, digest: &str) -> bool {
    if password.len() > MAX_PASSWORD_BYTES {
        return false;
    }
    match verify(password, digest) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Password digest could not be parsed");
            false
        }
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - At least 8 characters and at most 72 bytes
/// - At least one digit, one lowercase and one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), PasswordPolicyError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooShort(MIN_PASSWORD_LENGTH));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordPolicyError::TooLong(MAX_PASSWORD_BYTES));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(PasswordPolicyError::MissingCharacterClass);
    }

    Ok(())
}
