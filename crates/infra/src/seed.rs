//! Startup provisioning: the role catalog and an optional first administrator.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use keyward_auth::{
    ADMIN_ROLE, AuthError, CredentialStore, Identity, IdentityDraft, PasswordHasher, RoleName, StoreError,
    hash_blocking,
};
use keyward_core::normalize_email;

use crate::config::BootstrapAdmin;

/// Catalog installed on first start: `(name, description)`.
pub const DEFAULT_ROLES: &[(&str, &str)] = &[
    (ADMIN_ROLE, "Full system access, identity management and global configuration."),
    ("Operator", "Write and execute access to operational tooling."),
    ("Viewer", "Read-only access to final reports and dashboards."),
    ("Academic", "Access to raw data, scientific export and model validation."),
    ("Collaborator", "Access to the creative workspace and narrative editing."),
];

/// Insert every missing catalog role. Returns how many were created.
pub async fn seed_role_catalog(store: &dyn CredentialStore) -> Result<usize, StoreError> {
    let mut created = 0;
    for &(name, description) in DEFAULT_ROLES {
        if store.find_role(name).await?.is_some() {
            continue;
        }
        match store.insert_role(name, Some(description)).await {
            Ok(_) => created += 1,
            // Another instance seeded it first.
            Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    if created > 0 {
        info!(created, "role catalog seeded");
    }
    Ok(created)
}

/// Create the configured administrator unless that email is already registered.
///
/// The identity and its `Admin` grant are written together, so a failed
/// attempt leaves nothing behind for the next start to skip over.
/// Returns the new identity, or `None` when nothing was done.
pub async fn bootstrap_admin(
    store: &dyn CredentialStore,
    hasher: Arc<dyn PasswordHasher>,
    admin: &BootstrapAdmin,
) -> Result<Option<Identity>, AuthError> {
    let email = normalize_email(&admin.email)?;
    if admin.password.trim().is_empty() {
        return Err(AuthError::Validation("bootstrap admin password is empty".into()));
    }

    if store.find_by_email(&email).await?.is_some() {
        return Ok(None);
    }

    let hash = hash_blocking(hasher, admin.password.clone()).await?;
    let draft = IdentityDraft::new(email, admin.full_name.as_str(), hash)
        .with_roles(BTreeSet::from([RoleName::admin()]));
    let identity = store.create(draft).await?;

    warn!(identity_id = %identity.id, email = %identity.email, "bootstrapped administrator identity");

    Ok(Some(identity))
}
