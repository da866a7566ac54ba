//! Credential store contract.
//!
//! The core never talks to a database directly; it depends on this trait and
//! infrastructure provides implementations (in-memory, Postgres).

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_core::IdentityId;

use crate::{Identity, IdentityDraft, Role, RoleName, StoreError};

/// Identities, the role catalog and identity-role associations.
///
/// Emails passed in are expected to be normalized already
/// (see [`keyward_core::normalize_email`]).
///
/// Mutations on a missing identity or role fail with [`StoreError::NotFound`];
/// creating a duplicate email or role name fails with [`StoreError::Conflict`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError>;

    async fn list_identities(&self) -> Result<Vec<Identity>, StoreError>;

    /// Create an identity at the initial token version with the draft's roles
    /// and activation flag, atomically. Every role must exist in the catalog;
    /// on any failure nothing is written.
    async fn create(&self, draft: IdentityDraft) -> Result<Identity, StoreError>;

    async fn delete(&self, id: IdentityId) -> Result<(), StoreError>;

    /// Atomically advance `token_version` by one and return the new value.
    ///
    /// Implementations must make the read-modify-write a single atomic step:
    /// N concurrent calls advance the version by exactly N.
    async fn increment_version(&self, id: IdentityId) -> Result<u64, StoreError>;

    async fn set_active(&self, id: IdentityId, active: bool) -> Result<(), StoreError>;

    async fn record_login(&self, id: IdentityId, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Replace the identity's role set. Every role must exist in the catalog.
    async fn set_roles(&self, id: IdentityId, roles: BTreeSet<RoleName>) -> Result<(), StoreError>;

    /// Returns `true` if the role was newly granted.
    async fn add_role(&self, id: IdentityId, role: &RoleName) -> Result<bool, StoreError>;

    /// Returns `true` if the role was actually held and is now removed.
    async fn remove_role(&self, id: IdentityId, role: &RoleName) -> Result<bool, StoreError>;

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    async fn find_role(&self, name: &str) -> Result<Option<Role>, StoreError>;

    /// Add a catalog entry (provisioning only).
    async fn insert_role(&self, name: &str, description: Option<&str>) -> Result<Role, StoreError>;
}
