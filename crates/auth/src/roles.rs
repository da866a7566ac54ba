use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use keyward_core::RoleId;

/// Name of the superuser role. Holding it satisfies any role requirement.
pub const ADMIN_ROLE: &str = "Admin";

/// Role identifier used for RBAC.
///
/// Role names are unique in the catalog, so identities reference roles by
/// name rather than by catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn admin() -> Self {
        Self(Cow::Borrowed(ADMIN_ROLE))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == ADMIN_ROLE
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleName {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Role catalog entry. Seeded once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub description: Option<String>,
}
