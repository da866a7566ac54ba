//! Authentication service: login plus the administrative operations that sit
//! on top of the guardian's verdict.
//!
//! Every administrative method takes the acting identity as returned by
//! [`Guardian::validate`], so callers cannot skip validation.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use keyward_core::{IdentityId, normalize_email};

use crate::{
    ADMIN_ROLE, AuditAction, AuditEvent, AuditSink, AuthError, CredentialStore, Guardian, Identity,
    IdentityDraft, PasswordHash, PasswordHasher, Role, TokenConfig, TokenIssuer, authorize, hash_blocking,
    revoke_all, verify_blocking,
};

/// Token type reported to clients alongside the access token.
pub const TOKEN_TYPE: &str = "bearer";

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub access_token: String,
    pub token_type: String,
    pub roles: Vec<String>,
    pub user_name: String,
}

/// Input for administrative identity creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewIdentity {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleAction {
    Add,
    Remove,
}

/// Outcome of a role change. `changed` is false when the request was a no-op
/// (granting a held role, removing one that is not held).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleChange {
    pub changed: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revocation {
    pub identity_id: IdentityId,
    pub email: String,
    pub token_version: u64,
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: TokenIssuer,
    guardian: Guardian,
    audit: Arc<dyn AuditSink>,
    /// Verified against when the email is unknown, so a miss costs the same
    /// as a wrong password.
    dummy_hash: PasswordHash,
}

impl AuthService {
    pub fn new(
        config: &TokenConfig,
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash("keyward-timing-equalizer")?;
        Ok(Self {
            issuer: TokenIssuer::new(config),
            guardian: Guardian::new(config, store.clone()),
            store,
            hasher,
            audit,
            dummy_hash,
        })
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn guardian(&self) -> &Guardian {
        &self.guardian
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify credentials and issue a token stamped with the current version.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip_address: Option<String>,
    ) -> Result<LoginOutcome, AuthError> {
        let identity = match normalize_email(email) {
            Ok(email) => self.store.find_by_email(&email).await?,
            Err(_) => None,
        };

        let stored = identity
            .as_ref()
            .map_or(&self.dummy_hash, |identity| &identity.password_hash)
            .clone();
        let verified = verify_blocking(self.hasher.clone(), password.to_string(), stored).await?;

        let identity = match identity {
            Some(identity) if verified => identity,
            _ => return Err(AuthError::InvalidCredentials),
        };

        if !identity.is_active {
            return Err(AuthError::InactiveAccount);
        }

        let issued = self.issuer.issue_default(&identity)?;

        if let Err(e) = self.store.record_login(identity.id, chrono::Utc::now()).await {
            warn!(identity_id = %identity.id, error = %e, "failed to record login time");
        }

        info!(identity_id = %identity.id, token_version = identity.token_version, "login succeeded");
        self.audit.emit(
            AuditEvent::new(AuditAction::Login, Some(identity.id))
                .with_details(json!({ "email": identity.email }))
                .with_ip(ip_address),
        );

        Ok(LoginOutcome {
            access_token: issued.token,
            token_type: TOKEN_TYPE.to_string(),
            roles: identity.role_names(),
            user_name: identity.full_name,
        })
    }

    /// Run the guardian on a presented token.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        self.guardian.validate(token).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Revocation
    // ─────────────────────────────────────────────────────────────────────────

    /// Invalidate every outstanding token of the identity with `email`.
    pub async fn revoke_by_email(&self, actor: &Identity, email: &str) -> Result<Revocation, AuthError> {
        authorize(actor, ADMIN_ROLE)?;

        let email = normalize_email(email).map_err(|_| AuthError::NotFound("identity".into()))?;
        let target = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::NotFound("identity".into()))?;

        self.revoke(actor, target).await
    }

    /// Invalidate every outstanding token of the caller ("sign out everywhere").
    pub async fn revoke_own(&self, actor: &Identity) -> Result<Revocation, AuthError> {
        self.revoke(actor, actor.clone()).await
    }

    async fn revoke(&self, actor: &Identity, target: Identity) -> Result<Revocation, AuthError> {
        let token_version = revoke_all(self.store.as_ref(), target.id).await?;

        self.audit.emit(
            AuditEvent::new(AuditAction::TokensRevoked, Some(actor.id))
                .with_target(target.id)
                .with_details(json!({ "email": target.email, "token_version": token_version })),
        );

        Ok(Revocation {
            identity_id: target.id,
            email: target.email,
            token_version,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity administration
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn list_identities(&self, actor: &Identity) -> Result<Vec<Identity>, AuthError> {
        authorize(actor, ADMIN_ROLE)?;
        Ok(self.store.list_identities().await?)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AuthError> {
        Ok(self.store.list_roles().await?)
    }

    pub async fn create_identity(&self, actor: &Identity, new: NewIdentity) -> Result<Identity, AuthError> {
        authorize(actor, ADMIN_ROLE)?;

        let email = normalize_email(&new.email)?;
        let full_name = new.full_name.trim();
        if full_name.is_empty() {
            return Err(AuthError::Validation("full_name must not be empty".into()));
        }
        if new.password.is_empty() {
            return Err(AuthError::Validation("password must not be empty".into()));
        }

        let mut roles = BTreeSet::new();
        for name in &new.roles {
            let role = self
                .store
                .find_role(name)
                .await?
                .ok_or_else(|| AuthError::NotFound(format!("role '{name}'")))?;
            roles.insert(role.name);
        }

        let hash = hash_blocking(self.hasher.clone(), new.password).await?;
        let draft = IdentityDraft::new(email, full_name, hash)
            .with_roles(roles)
            .active(new.is_active);
        let identity = self.store.create(draft).await?;

        info!(identity_id = %identity.id, actor = %actor.id, "identity created");
        self.audit.emit(
            AuditEvent::new(AuditAction::IdentityCreated, Some(actor.id))
                .with_target(identity.id)
                .with_details(json!({
                    "email": identity.email,
                    "full_name": identity.full_name,
                    "roles": identity.role_names(),
                })),
        );

        Ok(identity)
    }

    /// Delete an identity. Deleting the acting identity is always rejected,
    /// whatever roles it holds.
    pub async fn delete_identity(&self, actor: &Identity, target: IdentityId) -> Result<(), AuthError> {
        if actor.id == target {
            return Err(AuthError::invalid_operation("cannot delete your own identity"));
        }
        authorize(actor, ADMIN_ROLE)?;

        let identity = self
            .store
            .find_by_id(target)
            .await?
            .ok_or_else(|| AuthError::NotFound("identity".into()))?;

        self.store.delete(target).await?;

        info!(identity_id = %target, actor = %actor.id, "identity deleted");
        self.audit.emit(
            AuditEvent::new(AuditAction::IdentityDeleted, Some(actor.id))
                .with_target(target)
                .with_details(json!({ "email": identity.email })),
        );

        Ok(())
    }

    pub async fn change_role(
        &self,
        actor: &Identity,
        target: IdentityId,
        role_name: &str,
        action: RoleAction,
    ) -> Result<RoleChange, AuthError> {
        authorize(actor, ADMIN_ROLE)?;

        let identity = self
            .store
            .find_by_id(target)
            .await?
            .ok_or_else(|| AuthError::NotFound("identity".into()))?;
        let role = self
            .store
            .find_role(role_name)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("role '{role_name}'")))?;

        let change = match action {
            RoleAction::Add => {
                let changed = self.store.add_role(target, &role.name).await?;
                let message = if changed {
                    format!("role {} granted to {}", role.name, identity.email)
                } else {
                    format!("{} already holds role {}", identity.email, role.name)
                };
                RoleChange { changed, message }
            }
            RoleAction::Remove => {
                let changed = self.store.remove_role(target, &role.name).await?;
                let message = if changed {
                    format!("role {} removed from {}", role.name, identity.email)
                } else {
                    format!("{} does not hold role {}", identity.email, role.name)
                };
                RoleChange { changed, message }
            }
        };

        self.audit.emit(
            AuditEvent::new(AuditAction::RoleChanged, Some(actor.id))
                .with_target(target)
                .with_details(json!({
                    "action": action,
                    "role": role.name,
                    "target_email": identity.email,
                    "changed": change.changed,
                })),
        );

        Ok(change)
    }

    /// Toggle activation. An inactive identity keeps its tokens but every one
    /// of them fails the guardian with `InactiveAccount` until reactivated.
    pub async fn set_active(
        &self,
        actor: &Identity,
        target: IdentityId,
        active: bool,
    ) -> Result<Identity, AuthError> {
        if actor.id == target {
            return Err(AuthError::invalid_operation("cannot change activation of your own identity"));
        }
        authorize(actor, ADMIN_ROLE)?;

        self.store.set_active(target, active).await?;
        let identity = self
            .store
            .find_by_id(target)
            .await?
            .ok_or_else(|| AuthError::NotFound("identity".into()))?;

        info!(identity_id = %target, active, actor = %actor.id, "identity activation changed");
        self.audit.emit(
            AuditEvent::new(AuditAction::ActivationChanged, Some(actor.id))
                .with_target(target)
                .with_details(json!({ "email": identity.email, "is_active": active })),
        );

        Ok(identity)
    }

    pub fn hasher(&self) -> &Arc<dyn PasswordHasher> {
        &self.hasher
    }
}
