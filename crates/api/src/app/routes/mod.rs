use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod auth;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(system::me))
        .route("/me/authorization", get(system::my_authorization))
        .route("/me/revoke-tokens", post(auth::revoke_own))
        .route("/roles", get(system::roles))
        .nest("/admin", admin::router())
}
