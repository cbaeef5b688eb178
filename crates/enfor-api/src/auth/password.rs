//! Password hashing and verification using Argon2id
//!
//! Parameters:
//! - Algorithm: Argon2id
//! - Memory: 64 MB
//! - Iterations: 3
//! - Parallelism: 1 lane
//! - Salt: random, encoded in the PHC string
//! - Output: 32 bytes hash
//!
//! Hashing is CPU- and memory-bound; async callers go through
//! [`hash_password_blocking`] and [`verify_password_blocking`] so the work
//! runs on tokio's blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    #[error("Password task was cancelled")]
    TaskFailed,
}

/// Argon2 cost parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (lanes, default: 1)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 1,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Cheap parameters for tests and local tooling. Never use in production.
    pub fn light() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash a plaintext password with the default parameters.
///
/// # Returns
///
/// * `Ok(String)` - PHC string (algorithm, parameters, salt and hash)
/// * `Err(PasswordError)` - If hashing fails
///
/// # Example
///
/// ```no_run
/// use enfor_api::auth::password::hash_password;
///
/// let hash = hash_password("secret123").expect("Failed to hash password");
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with_config(password, &PasswordConfig::default())
}

/// Hash a password with custom parameters
pub fn hash_password_with_config(
    password: &str,
    config: &PasswordConfig,
) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, config.to_params()?);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash.
///
/// The parameters are read from the hash itself.
///
/// # Returns
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError)` - The stored hash could not be parsed or checked
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// [`hash_password_with_config`] on the blocking thread pool
pub async fn hash_password_blocking(
    password: String,
    config: PasswordConfig,
) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
        .await
        .map_err(|_| PasswordError::TaskFailed)?
}

/// [`verify_password`] on the blocking thread pool
pub async fn verify_password_blocking(
    password: String,
    hash: String,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|_| PasswordError::TaskFailed)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret123").expect("Failed to hash password");
        assert_ne!(hash, "secret123");
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=1"));

        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("secret124", &hash).unwrap());
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let config = PasswordConfig::light();
        let hash1 = hash_password_with_config("same-password", &config).unwrap();
        let hash2 = hash_password_with_config("same-password", &config).unwrap();
        assert_ne!(hash1, hash2);

        assert!(verify_password("same-password", &hash1).unwrap());
        assert!(verify_password("same-password", &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_light_config_parameters() {
        let hash = hash_password_with_config("secret123", &PasswordConfig::light()).unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=1024"));
        assert!(hash.contains("t=1"));
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let hash = hash_password_blocking("secret123".to_string(), PasswordConfig::light())
            .await
            .unwrap();
        assert!(verify_password_blocking("secret123".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("nope".to_string(), hash).await.unwrap());
    }
}
