//! Argon2 password hashing
//!
//! Hashing is CPU-bound, so both operations run on the blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash a password into a PHC string with a fresh salt.
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| PasswordError::Hash(err.to_string()))
    })
    .await?
}

/// Returns `Ok(false)` on a mismatch; a malformed stored hash is an error.
pub async fn verify_password(password: &str, expected_hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_owned();
    let expected_hash = expected_hash.to_owned();
    tokio::task::spawn_blocking(move || -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(&expected_hash).map_err(|err| PasswordError::Hash(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("password123").await.unwrap();
        assert_ne!(hash, "password123");
        assert!(verify_password("password123", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_an_error() {
        assert!(verify_password("password123", "plaintext").await.is_err());
    }
}
