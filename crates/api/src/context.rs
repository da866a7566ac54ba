use std::sync::Arc;

use keyward_auth::Identity;

/// Identity resolved by the guardian for the current request.
///
/// Read fresh from the credential store on every call, so roles and activation
/// reflect the store as of this request, not as of login.
#[derive(Debug, Clone)]
pub struct CurrentIdentity {
    identity: Arc<Identity>,
}

impl CurrentIdentity {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity: Arc::new(identity),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}
