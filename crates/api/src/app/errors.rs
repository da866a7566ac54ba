use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use keyward_auth::AuthError;

/// Handler-facing error: every [`AuthError`] maps to one status + JSON body.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        auth_error_to_response(self.0)
    }
}

pub fn auth_error_to_response(err: AuthError) -> Response {
    match err {
        AuthError::InvalidCredentials => unauthorized("invalid_credentials", "incorrect email or password"),
        // Expired and invalid tokens share one message.
        AuthError::InvalidToken | AuthError::Expired => {
            unauthorized("invalid_token", "could not validate credentials")
        }
        AuthError::InactiveAccount => json_error(StatusCode::FORBIDDEN, "inactive_account", "account is inactive"),
        e @ AuthError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
        AuthError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        AuthError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        AuthError::InvalidOperation(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_operation", msg),
        AuthError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AuthError::Unavailable(msg) => {
            error!(error = %msg, "credential store unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "credential store unavailable",
            )
        }
        AuthError::Internal(msg) => {
            error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn unauthorized(code: &'static str, message: &'static str) -> Response {
    let mut response = json_error(StatusCode::UNAUTHORIZED, code, message);
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
