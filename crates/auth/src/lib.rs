//! `keyward-auth`: credential issuance, validation, revocation and RBAC.
//!
//! This crate is intentionally decoupled from HTTP and storage: persistence is
//! reached through [`CredentialStore`], audit output through [`AuditSink`].

pub mod audit;
pub mod authorize;
pub mod claims;
pub mod config;
pub mod error;
pub mod guardian;
pub mod identity;
pub mod issuer;
pub mod password;
pub mod revocation;
pub mod roles;
pub mod service;
pub mod store;

pub use audit::{AuditAction, AuditEvent, AuditSink, NoopAuditSink};
pub use authorize::{AuthorizationExplanation, authorize, authorize_any, authorize_roles, explain};
pub use claims::TokenClaims;
pub use config::{MIN_SECRET_LEN, TokenConfig, TokenConfigError};
pub use error::{AuthError, StoreError};
pub use guardian::Guardian;
pub use identity::{INITIAL_TOKEN_VERSION, Identity, IdentityDraft, IdentitySummary, PasswordHash};
pub use issuer::{IssuedToken, TOKEN_ALGORITHM, TokenIssuer};
pub use password::{Argon2Hasher, PasswordHasher, hash_blocking, verify_blocking};
pub use revocation::revoke_all;
pub use roles::{ADMIN_ROLE, Role, RoleName};
pub use service::{AuthService, LoginOutcome, NewIdentity, Revocation, RoleAction, RoleChange, TOKEN_TYPE};
pub use store::CredentialStore;
