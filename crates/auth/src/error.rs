//! Error taxonomy for credential, token and authorization failures.

use thiserror::Error;

use keyward_core::DomainError;

/// Failure of a credential store operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing engine failed (connection, query, decode).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Outcome of a failed authentication, validation or authorization step.
///
/// `InvalidToken` deliberately covers bad signatures, malformed claims,
/// unknown subjects and stale version stamps alike, so a caller probing with a
/// revoked token learns nothing beyond "not valid".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    InactiveAccount,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    Expired,

    #[error("forbidden: role '{0}' required")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => AuthError::NotFound(what),
            StoreError::Conflict(what) => AuthError::Conflict(what),
            StoreError::Backend(msg) => AuthError::Unavailable(msg),
        }
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => AuthError::Validation(msg),
            DomainError::InvalidId(msg) => AuthError::Validation(msg),
        }
    }
}
