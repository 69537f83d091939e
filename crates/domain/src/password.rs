//! bcrypt password hashes in the modular crypt format (`$2b$<cost>$...`).

use crate::error::DomainError;

/// Work factor used unless configured otherwise.
pub const PASSWORD_COST: u32 = 14;

/// Cheapest cost bcrypt accepts.
pub const MIN_PASSWORD_COST: u32 = 4;

/// Hashes a password under a fresh random salt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, DomainError> {
    bcrypt::hash(password, cost)
        .map_err(|e| DomainError::Internal(format!("password hashing failed: {e}")))
}

/// Checks a password against a stored bcrypt hash.
///
/// Malformed stored values never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}
