//! Identity model owned by the credential store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keyward_core::IdentityId;

use crate::RoleName;

/// Version assigned to a freshly created identity.
pub const INITIAL_TOKEN_VERSION: u64 = 1;

/// Opaque, already-hashed password (PHC string).
///
/// `Debug` is redacted and the type is never serialized, so a hash cannot end
/// up in logs or API responses by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// An authenticatable identity.
///
/// # Invariants
/// - `email` is normalized and unique within the store.
/// - `token_version` starts at [`INITIAL_TOKEN_VERSION`] and never decreases.
/// - A credential is only honored while its version stamp equals
///   `token_version` and `is_active` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
    pub full_name: String,
    pub password_hash: PasswordHash,
    pub is_active: bool,
    pub token_version: u64,
    pub roles: BTreeSet<RoleName>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// A new active identity with no roles at the initial token version.
    pub fn new(email: String, full_name: String, password_hash: PasswordHash) -> Self {
        Self {
            id: IdentityId::new(),
            email,
            full_name,
            password_hash,
            is_active: true,
            token_version: INITIAL_TOKEN_VERSION,
            roles: BTreeSet::new(),
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }

    /// Public view of the identity (everything except the password hash).
    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            is_active: self.is_active,
            token_version: self.token_version,
            roles: self.role_names(),
            created_at: self.created_at,
            last_login_at: self.last_login_at,
        }
    }
}

/// Initial state of an identity, written by [`crate::CredentialStore::create`]
/// in one step so the identity is never visible without its roles or with the
/// wrong activation flag.
#[derive(Debug, Clone)]
pub struct IdentityDraft {
    pub email: String,
    pub full_name: String,
    pub password_hash: PasswordHash,
    pub roles: BTreeSet<RoleName>,
    pub is_active: bool,
}

impl IdentityDraft {
    /// An active identity with no roles.
    pub fn new(email: impl Into<String>, full_name: impl Into<String>, password_hash: PasswordHash) -> Self {
        Self {
            email: email.into(),
            full_name: full_name.into(),
            password_hash,
            roles: BTreeSet::new(),
            is_active: true,
        }
    }

    pub fn with_roles(mut self, roles: BTreeSet<RoleName>) -> Self {
        self.roles = roles;
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Materialize with a fresh id at the initial token version.
    pub fn into_identity(self) -> Identity {
        let mut identity = Identity::new(self.email, self.full_name, self.password_hash);
        identity.roles = self.roles;
        identity.is_active = self.is_active;
        identity
    }
}

/// Serializable projection of an [`Identity`] without secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub id: IdentityId,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub token_version: u64,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}
