//! Stateless revocation by version advance.
//!
//! Revoking never touches tokens: it bumps the identity's `token_version`, and
//! every credential stamped with an older version fails the guardian's version
//! check on its next use. Cost is one atomic store write regardless of how many
//! tokens are outstanding, and calling it again simply advances once more.

use tracing::info;

use keyward_core::IdentityId;

use crate::{AuthError, CredentialStore};

/// Invalidate every credential issued to `id` so far. Returns the new version.
pub async fn revoke_all(store: &dyn CredentialStore, id: IdentityId) -> Result<u64, AuthError> {
    let version = store.increment_version(id).await?;
    info!(identity_id = %id, token_version = version, "revoked all outstanding tokens");
    Ok(version)
}
