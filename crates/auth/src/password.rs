//! Password hashing contract and the default Argon2id implementation.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash as PhcHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
        rand_core::OsRng,
    },
};

use crate::{AuthError, PasswordHash};

/// One-way password hashing.
///
/// `verify` must not leak through timing which part of the comparison failed,
/// and must return `false` (not an error) for a malformed stored hash.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<PasswordHash, AuthError>;

    fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool;
}

/// Argon2id with a random salt per hash, stored as a PHC string.
#[derive(Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<PasswordHash, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let encoded = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?
            .to_string();
        Ok(PasswordHash::new(encoded))
    }

    fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        let parsed = match PhcHash::new(hash.as_str()) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };
        // Digest comparison inside argon2 is constant-time.
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Hash on tokio's blocking pool. Argon2 is deliberately slow and would
/// otherwise stall every task sharing the async worker.
pub async fn hash_blocking(hasher: Arc<dyn PasswordHasher>, plaintext: String) -> Result<PasswordHash, AuthError> {
    tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
        .await
        .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))?
}

/// Verify on tokio's blocking pool.
pub async fn verify_blocking(
    hasher: Arc<dyn PasswordHasher>,
    plaintext: String,
    hash: PasswordHash,
) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))
}
