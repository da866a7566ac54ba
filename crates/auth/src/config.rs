//! Token signing configuration.
//!
//! Built once at process start and handed to the issuer and the guardian;
//! nothing reads signing material from globals.

use chrono::Duration;
use thiserror::Error;

/// Shortest HS256 secret accepted (bytes).
pub const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    #[error("signing secret must be at least {MIN_SECRET_LEN} bytes (got {0})")]
    SecretTooShort(usize),

    #[error("token ttl must be positive")]
    NonPositiveTtl,
}

/// Immutable signing key + default credential lifetime.
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Result<Self, TokenConfigError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenConfigError::SecretTooShort(secret.len()));
        }
        if ttl <= Duration::zero() {
            return Err(TokenConfigError::NonPositiveTtl);
        }
        Ok(Self { secret, ttl })
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}
