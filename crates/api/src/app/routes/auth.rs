use std::sync::Arc;

use axum::{Json, extract::Extension, http::HeaderMap};

use keyward_auth::LoginOutcome;

use crate::app::dto::{LoginRequest, RevocationResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CurrentIdentity;
use crate::middleware::client_ip;

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, ApiError> {
    let outcome = services
        .auth
        .login(&body.email, &body.password, client_ip(&headers))
        .await?;
    Ok(Json(outcome))
}

/// POST /me/revoke-tokens - sign out everywhere, including this token.
pub async fn revoke_own(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentIdentity>,
) -> Result<Json<RevocationResponse>, ApiError> {
    let revocation = services.auth.revoke_own(current.identity()).await?;
    Ok(Json(revocation.into()))
}
