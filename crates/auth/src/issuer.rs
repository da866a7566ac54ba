//! Token issuer: stamps the identity's current version into a signed JWT.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};

use crate::{AuthError, Identity, TokenClaims, TokenConfig};

/// Signing algorithm for every issued credential.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// A freshly signed credential together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// Stateless credential issuer.
pub struct TokenIssuer {
    key: EncodingKey,
    header: Header,
    default_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(config.secret()),
            header: Header::new(TOKEN_ALGORITHM),
            default_ttl: config.ttl(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a credential valid for `ttl` from now.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<IssuedToken, AuthError> {
        self.issue_at(identity, Utc::now(), ttl)
    }

    /// Issue a credential with the configured default lifetime.
    pub fn issue_default(&self, identity: &Identity) -> Result<IssuedToken, AuthError> {
        self.issue(identity, self.default_ttl)
    }

    /// Issue a credential as of `now`. A non-positive `ttl` yields an
    /// already-expired token, which is occasionally useful in tests.
    pub fn issue_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        let claims = TokenClaims {
            sub: identity.id,
            email: identity.email.clone(),
            roles: identity.roles.iter().cloned().collect(),
            ver: identity.token_version,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = jsonwebtoken::encode(&self.header, &claims, &self.key)
            .map_err(|e| AuthError::internal(format!("token signing failed: {e}")))?;

        Ok(IssuedToken { token, claims })
    }
}
