use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("invalid salt: {0}")]
    InvalidSalt(String),

    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("hashing task failed: {0}")]
    Task(String),
}

pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).as_str().to_string()
}

/// Hashes `password` with the given base64 salt, returning a PHC string.
pub fn hash_password(password: &str, salt: &str) -> Result<String, PasswordError> {
    let salt = SaltString::from_b64(salt).map_err(|e| PasswordError::InvalidSalt(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(stored_hash).map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn hash_password_async(password: String, salt: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password, &salt))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
}

/// Runs [`verify_password`] on the blocking pool.
pub async fn verify_password_async(
    password: String,
    stored_hash: String,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
}
