//! Role gate for handlers that do not go through an `AuthService` operation.

use keyward_auth::authorize;

use crate::app::errors::ApiError;
use crate::context::CurrentIdentity;

/// Require `role` (or `Admin`) of the current identity.
pub fn require_role(current: &CurrentIdentity, role: &str) -> Result<(), ApiError> {
    authorize(current.identity(), role).map_err(ApiError::from)
}
