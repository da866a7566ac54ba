use serde::{Deserialize, Serialize};

use keyward_core::IdentityId;

use crate::RoleName;

/// Claims carried by an issued credential.
///
/// `ver` is the identity's `token_version` at issuance; the guardian compares
/// it against the live counter on every use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject / identity identifier.
    pub sub: IdentityId,

    pub email: String,

    /// Role names held at issuance. Informational only: authorization
    /// decisions use the identity's live role set.
    pub roles: Vec<RoleName>,

    /// Version stamp.
    pub ver: u64,

    /// Issued-at (seconds since the Unix epoch).
    pub iat: i64,

    /// Expiration (seconds since the Unix epoch).
    pub exp: i64,
}

/// Claims as decoded from an untrusted token.
///
/// Every field the guardian depends on is optional here so a token that
/// verifies but lacks `sub` or `ver` is rejected by the guardian rather than
/// failing inside the decoder.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UntrustedClaims {
    pub sub: Option<String>,
    pub ver: Option<u64>,
}
