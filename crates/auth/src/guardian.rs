//! The guardian: validation gate run on every protected call.
//!
//! A presented token goes through five steps, each of which can only fail
//! into a fixed outcome:
//!
//! | step          | check                                   | failure           |
//! |---------------|-----------------------------------------|-------------------|
//! | decode        | HS256 signature, then `exp` (no leeway) | `InvalidToken` / `Expired` |
//! | extract       | `sub` and `ver` present and well-formed | `InvalidToken`    |
//! | lookup        | identity exists                         | `InvalidToken`    |
//! | version check | `ver == identity.token_version`         | `InvalidToken`    |
//! | active check  | `identity.is_active`                    | `InactiveAccount` |
//!
//! Revocation is enforced at the version check. Identities are read fresh on
//! every call, so there is no cache to invalidate.

use std::collections::HashSet;
use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Validation, errors::ErrorKind};
use tracing::{debug, warn};

use keyward_core::IdentityId;

use crate::claims::UntrustedClaims;
use crate::issuer::TOKEN_ALGORITHM;
use crate::{AuthError, CredentialStore, Identity, TokenConfig};

/// Token validator.
///
/// Side-effect free and idempotent; safe to call concurrently from any number
/// of request handlers.
pub struct Guardian {
    store: Arc<dyn CredentialStore>,
    key: DecodingKey,
    validation: Validation,
}

impl Guardian {
    pub fn new(config: &TokenConfig, store: Arc<dyn CredentialStore>) -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            store,
            key: DecodingKey::from_secret(config.secret()),
            validation,
        }
    }

    /// Validate a bearer token and resolve the live identity behind it.
    pub async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode(token)?;
        let (subject, version) = extract(claims)?;

        let identity = self
            .store
            .find_by_id(subject)
            .await
            .map_err(AuthError::from)?
            .ok_or_else(|| {
                debug!(subject = %subject, "token subject not found");
                AuthError::InvalidToken
            })?;

        if identity.token_version != version {
            warn!(
                subject = %subject,
                token_version = version,
                current_version = identity.token_version,
                "rejected token with stale version stamp"
            );
            return Err(AuthError::InvalidToken);
        }

        if !identity.is_active {
            return Err(AuthError::InactiveAccount);
        }

        Ok(identity)
    }

    fn decode(&self, token: &str) -> Result<UntrustedClaims, AuthError> {
        jsonwebtoken::decode::<UntrustedClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                other => {
                    debug!(reason = ?other, "token failed to decode");
                    AuthError::InvalidToken
                }
            })
    }
}

fn extract(claims: UntrustedClaims) -> Result<(IdentityId, u64), AuthError> {
    let (Some(sub), Some(ver)) = (claims.sub, claims.ver) else {
        debug!("token missing sub or ver");
        return Err(AuthError::InvalidToken);
    };
    let subject = sub.parse::<IdentityId>().map_err(|_| AuthError::InvalidToken)?;
    Ok((subject, ver))
}
