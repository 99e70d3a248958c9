//! Password hashing and verification utilities.
//!
//! New hashes are Argon2id PHC strings. Rows written by earlier deployments
//! carry bcrypt hashes (`$2a$`, `$2b$`, `$2y$`); those still verify so existing
//! users can keep logging in.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2 error: {0}")]
    Argon2(argon2::password_hash::Error),
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

impl From<argon2::password_hash::Error> for PasswordError {
    fn from(err: argon2::password_hash::Error) -> Self {
        PasswordError::Argon2(err)
    }
}

/// Hash a password using default Argon2 settings.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    Ok(argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a password against a stored hash.
///
/// Returns `Ok(false)` on mismatch. Errors are reserved for hashes that
/// cannot be parsed at all.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    if is_bcrypt_hash(stored) {
        return Ok(bcrypt::verify(password, stored)?);
    }

    let hash = PasswordHash::new(stored)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok())
}

fn is_bcrypt_hash(stored: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|p| stored.starts_with(p))
}

// Computed once so the dummy check runs the same Argon2 parameters as real ones.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("timing-oracle-dummy").ok());

/// Burn the CPU time of one real verification.
///
/// Called when the email is unknown, so response time does not reveal
/// whether an account exists.
pub fn dummy_verify(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}
