//! Argon2id hashing for account secrets and the master password.
//!
//! Hashes are PHC strings, so the salt and parameters travel with the hash.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

pub use argon2::password_hash::Error as HashError;

/// Hash a plaintext secret with a fresh random salt.
pub fn hash_secret(secret: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when `hash` is not a usable PHC string.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, HashError> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
