use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
};

use keyward_auth::{AuthorizationExplanation, IdentitySummary, Role, explain};

use crate::app::dto::AuthorizationQuery;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require_role;
use crate::context::CurrentIdentity;

/// Minimum role for reading the role catalog.
pub const CATALOG_READ_ROLE: &str = "Viewer";

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /me
pub async fn me(Extension(current): Extension<CurrentIdentity>) -> Json<IdentitySummary> {
    Json(current.identity().summary())
}

/// GET /me/authorization?role=R - would the caller pass a gate requiring R?
pub async fn my_authorization(
    Extension(current): Extension<CurrentIdentity>,
    Query(query): Query<AuthorizationQuery>,
) -> Json<AuthorizationExplanation> {
    Json(explain(current.identity(), &query.role))
}

/// GET /roles
pub async fn roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
) -> Result<Json<Vec<Role>>, ApiError> {
    require_role(&current, CATALOG_READ_ROLE)?;
    Ok(Json(services.auth.list_roles().await?))
}
