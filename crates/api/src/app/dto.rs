use serde::{Deserialize, Serialize};

use keyward_auth::{IdentitySummary, Revocation, RoleAction};
use keyward_core::IdentityId;

pub use keyward_auth::NewIdentity as CreateIdentityRequest;

/// Page size used when `/admin/audit-logs` gets no `limit`.
pub const DEFAULT_AUDIT_PAGE: usize = 100;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub role_name: String,
    pub action: RoleAction,
}

#[derive(Debug, Deserialize)]
pub struct AuthorizationQuery {
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct RevocationResponse {
    pub message: String,
    pub identity_id: IdentityId,
    pub email: String,
    pub token_version: u64,
}

impl From<Revocation> for RevocationResponse {
    fn from(r: Revocation) -> Self {
        Self {
            message: format!("all tokens for {} have been revoked", r.email),
            identity_id: r.identity_id,
            email: r.email,
            token_version: r.token_version,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IdentityListResponse {
    pub identities: Vec<IdentitySummary>,
}
