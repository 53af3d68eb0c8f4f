/// Password Hashing and Verification

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt silently truncates input beyond 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

lazy_static::lazy_static! {
    /// Verified against when the username is unknown, so both login failure
    /// paths cost one bcrypt round
    static ref DUMMY_HASH: Option<String> = hash("not-a-real-password", DEFAULT_COST).ok();
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if the password is outside 8..=72 bytes or hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_length(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against the stored hash of a user, if there is one.
///
/// Returns `Ok(false)` for an unknown user after doing the same work as for a
/// known one.
pub fn verify_password(password: &str, stored_hash: Option<&str>) -> Result<bool, AppError> {
    match stored_hash {
        Some(stored) => verify(password, stored)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e))),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify(password, dummy);
            }
            Ok(false)
        }
    }
}

fn validate_password_length(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    Ok(())
}
