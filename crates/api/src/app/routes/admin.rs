//! Admin routes for identity management and token revocation.
//!
//! Authorization lives in `AuthService`; handlers only translate HTTP.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{delete, get, post},
};

use keyward_auth::{ADMIN_ROLE, AuditEvent, AuthError, IdentitySummary, RoleChange};
use keyward_core::IdentityId;

use crate::app::dto::{
    AuditLogQuery, CreateIdentityRequest, DEFAULT_AUDIT_PAGE, IdentityListResponse, RevocationResponse,
    RoleChangeRequest,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require_role;
use crate::context::CurrentIdentity;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/revoke-user-tokens/:email", post(revoke_user_tokens))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/roles", post(change_role))
        .route("/users/:id/activate", post(activate_user))
        .route("/users/:id/deactivate", post(deactivate_user))
        .route("/audit-logs", get(audit_logs))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /admin/revoke-user-tokens/:email
pub async fn revoke_user_tokens(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
    Path(email): Path<String>,
) -> Result<Json<RevocationResponse>, ApiError> {
    let revocation = services.auth.revoke_by_email(current.identity(), &email).await?;
    Ok(Json(revocation.into()))
}

/// GET /admin/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
) -> Result<Json<IdentityListResponse>, ApiError> {
    let identities = services.auth.list_identities(current.identity()).await?;
    Ok(Json(IdentityListResponse {
        identities: identities.iter().map(|i| i.summary()).collect(),
    }))
}

/// POST /admin/users
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
    Json(body): Json<CreateIdentityRequest>,
) -> Result<(StatusCode, Json<IdentitySummary>), ApiError> {
    let created = services.auth.create_identity(current.identity(), body).await?;
    Ok((StatusCode::CREATED, Json(created.summary())))
}

/// DELETE /admin/users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let target = parse_identity_id(&id)?;
    services.auth.delete_identity(current.identity(), target).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/users/:id/roles
pub async fn change_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
    Path(id): Path<String>,
    Json(body): Json<RoleChangeRequest>,
) -> Result<Json<RoleChange>, ApiError> {
    let target = parse_identity_id(&id)?;
    let change = services
        .auth
        .change_role(current.identity(), target, &body.role_name, body.action)
        .await?;
    Ok(Json(change))
}

/// POST /admin/users/:id/activate
pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
    Path(id): Path<String>,
) -> Result<Json<IdentitySummary>, ApiError> {
    set_active(&services, &current, &id, true).await
}

/// POST /admin/users/:id/deactivate
pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
    Path(id): Path<String>,
) -> Result<Json<IdentitySummary>, ApiError> {
    set_active(&services, &current, &id, false).await
}

/// GET /admin/audit-logs?skip&limit - newest first.
pub async fn audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditEvent>>, ApiError> {
    require_role(&current, ADMIN_ROLE)?;
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_PAGE);
    Ok(Json(services.audit_log.list(skip, limit)))
}

async fn set_active(
    services: &AppServices,
    current: &CurrentIdentity,
    id: &str,
    active: bool,
) -> Result<Json<IdentitySummary>, ApiError> {
    let target = parse_identity_id(id)?;
    let identity = services.auth.set_active(current.identity(), target, active).await?;
    Ok(Json(identity.summary()))
}

/// Malformed ids cannot name an identity, so they read as "not found".
fn parse_identity_id(raw: &str) -> Result<IdentityId, ApiError> {
    raw.parse::<IdentityId>()
        .map_err(|_| ApiError(AuthError::NotFound("identity".into())))
}
