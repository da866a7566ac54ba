use std::collections::BTreeSet;

use serde::Serialize;

use crate::{ADMIN_ROLE, AuthError, Identity, RoleName};

/// Authorize an already-validated identity against a required role.
///
/// - No IO
/// - No panics
/// - `Admin` satisfies every requirement
pub fn authorize(identity: &Identity, required: &str) -> Result<(), AuthError> {
    authorize_roles(&identity.roles, required)
}

/// Role-set form of [`authorize`].
pub fn authorize_roles(roles: &BTreeSet<RoleName>, required: &str) -> Result<(), AuthError> {
    if holds(roles, required) || holds_admin(roles) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(required.to_string()))
    }
}

/// Passes if any of `accepted` is held (or `Admin`).
///
/// With an empty `accepted` list only `Admin` passes.
pub fn authorize_any(identity: &Identity, accepted: &[&str]) -> Result<(), AuthError> {
    if holds_admin(&identity.roles) || accepted.iter().any(|r| holds(&identity.roles, r)) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(accepted.join(" | ")))
    }
}

fn holds(roles: &BTreeSet<RoleName>, name: &str) -> bool {
    roles.iter().any(|r| r.as_str() == name)
}

fn holds_admin(roles: &BTreeSet<RoleName>) -> bool {
    roles.iter().any(RoleName::is_admin)
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Why a role requirement was (or would be) granted or denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationExplanation {
    pub required_role: String,
    pub granted: bool,
    pub reason: String,
    pub roles_held: Vec<String>,
    pub via_admin: bool,
}

/// Explain the decision [`authorize`] would make. Answers "why was I denied?".
pub fn explain(identity: &Identity, required: &str) -> AuthorizationExplanation {
    let roles_held = identity.role_names();
    let direct = holds(&identity.roles, required);
    let admin = holds_admin(&identity.roles);

    let (granted, reason) = if direct {
        (true, format!("Identity holds role '{required}'"))
    } else if admin {
        (true, format!("Identity holds '{ADMIN_ROLE}', which satisfies any role requirement"))
    } else {
        (
            false,
            format!("Role '{required}' is required; identity holds {roles_held:?}"),
        )
    };

    AuthorizationExplanation {
        required_role: required.to_string(),
        granted,
        reason,
        roles_held,
        via_admin: admin && !direct,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::PasswordHash;

    fn identity_with(roles: &[&str]) -> Identity {
        let mut identity = Identity::new("x@example.com".into(), "X".into(), PasswordHash::new("h"));
        identity.roles = roles.iter().map(|r| RoleName::from(*r)).collect();
        identity
    }

    #[test]
    fn viewer_is_denied_admin() {
        let viewer = identity_with(&["Viewer"]);
        assert_eq!(authorize(&viewer, "Admin"), Err(AuthError::Forbidden("Admin".into())));
    }

    #[test]
    fn held_role_is_granted() {
        let viewer = identity_with(&["Viewer"]);
        assert_eq!(authorize(&viewer, "Viewer"), Ok(()));
    }

    #[test]
    fn no_roles_is_denied() {
        assert!(authorize(&identity_with(&[]), "Viewer").is_err());
    }

    #[test]
    fn role_names_are_case_sensitive() {
        assert!(authorize(&identity_with(&["admin"]), "Operator").is_err());
    }

    #[test]
    fn authorize_any_accepts_one_of() {
        let academic = identity_with(&["Academic"]);
        assert!(authorize_any(&academic, &["Collaborator", "Academic"]).is_ok());
        assert!(authorize_any(&academic, &["Collaborator", "Operator"]).is_err());
        assert!(authorize_any(&identity_with(&["Admin"]), &[]).is_ok());
        assert!(authorize_any(&academic, &[]).is_err());
    }

    #[test]
    fn explain_reports_admin_escape_hatch() {
        let admin = identity_with(&["Admin"]);
        let explanation = explain(&admin, "Operator");
        assert!(explanation.granted);
        assert!(explanation.via_admin);

        let viewer = identity_with(&["Viewer"]);
        let explanation = explain(&viewer, "Operator");
        assert!(!explanation.granted);
        assert_eq!(explanation.roles_held, vec!["Viewer".to_string()]);
    }

    proptest! {
        #[test]
        fn admin_is_granted_any_requirement(required in "[A-Za-z]{1,16}", others in proptest::collection::vec("[A-Za-z]{1,12}", 0..4)) {
            let mut roles: Vec<&str> = others.iter().map(String::as_str).collect();
            roles.push("Admin");
            let identity = identity_with(&roles);
            prop_assert!(authorize(&identity, &required).is_ok());
        }

        #[test]
        fn non_admin_granted_iff_role_held(required in "[A-Za-z]{1,16}", held in proptest::collection::vec("[A-Za-z]{1,12}", 0..5)) {
            prop_assume!(!held.iter().any(|r| r == "Admin"));
            let roles: Vec<&str> = held.iter().map(String::as_str).collect();
            let identity = identity_with(&roles);
            let expected = held.contains(&required);
            prop_assert_eq!(authorize(&identity, &required).is_ok(), expected);
            prop_assert_eq!(explain(&identity, &required).granted, expected);
        }
    }
}
