//! End-to-end credential lifecycle tests against the in-memory store.
//!
//! Tests: Login → Issuer → Guardian → Revocation → Authorizer
//!
//! Verifies:
//! - Revocation invalidates every outstanding token and only those
//! - Signature, expiry and claim failures are rejected before any lookup matters
//! - Activation and administrative guards hold across the service boundary

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    use keyward_auth::{
        Argon2Hasher, AuditAction, AuthError, AuthService, CredentialStore, Identity, IdentityDraft, NewIdentity,
        NoopAuditSink, PasswordHash, PasswordHasher, RoleAction, RoleName, TokenConfig, TokenIssuer, authorize, revoke_all,
    };

    use crate::audit::InMemoryAuditLog;
    use crate::seed::seed_role_catalog;
    use crate::store::InMemoryCredentialStore;

    const SECRET: &str = "integration-test-secret-0123456789";
    const PASSWORD: &str = "s3cret-pass";

    struct Harness {
        service: AuthService,
        store: Arc<InMemoryCredentialStore>,
        audit: Arc<InMemoryAuditLog>,
        config: TokenConfig,
        admin: Identity,
    }

    impl Harness {
        async fn new() -> Self {
            let config = TokenConfig::new(SECRET, Duration::minutes(60)).unwrap();
            let store = Arc::new(InMemoryCredentialStore::new());
            let audit = Arc::new(InMemoryAuditLog::default());
            seed_role_catalog(store.as_ref()).await.unwrap();

            let service = AuthService::new(
                &config,
                store.clone(),
                Arc::new(Argon2Hasher::new()),
                audit.clone(),
            )
            .unwrap();

            let hash = service.hasher().hash(PASSWORD).unwrap();
            let admin = store
                .create(
                    IdentityDraft::new("admin@example.com", "Admin", hash)
                        .with_roles(BTreeSet::from([RoleName::admin()])),
                )
                .await
                .unwrap();

            Self {
                service,
                store,
                audit,
                config,
                admin,
            }
        }

        async fn create(&self, email: &str, roles: &[&str]) -> Identity {
            self.service
                .create_identity(
                    &self.admin,
                    NewIdentity {
                        email: email.to_string(),
                        full_name: email.to_string(),
                        password: PASSWORD.to_string(),
                        is_active: true,
                        roles: roles.iter().map(|r| r.to_string()).collect(),
                    },
                )
                .await
                .unwrap()
        }

        async fn token_for(&self, email: &str) -> String {
            self.service
                .login(email, PASSWORD, None)
                .await
                .unwrap()
                .access_token
        }
    }

    #[tokio::test]
    async fn login_token_round_trips_through_guardian() {
        let h = Harness::new().await;
        let viewer = h.create("ana@example.com", &["Viewer"]).await;

        let outcome = h.service.login("ANA@example.com ", PASSWORD, Some("10.0.0.1".into())).await.unwrap();
        assert_eq!(outcome.token_type, "bearer");
        assert_eq!(outcome.roles, vec!["Viewer".to_string()]);

        let identity = h.service.authenticate(&outcome.access_token).await.unwrap();
        assert_eq!(identity.id, viewer.id);
        assert!(authorize(&identity, "Viewer").is_ok());
        assert!(matches!(authorize(&identity, "Operator"), Err(AuthError::Forbidden(_))));

        let logged = h.store.find_by_id(viewer.id).await.unwrap().unwrap();
        assert!(logged.last_login_at.is_some());

        let login_event = &h.audit.list(0, 1)[0];
        assert_eq!(login_event.action, AuditAction::Login);
        assert_eq!(login_event.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn revocation_invalidates_every_earlier_token() {
        let h = Harness::new().await;
        h.create("ana@example.com", &["Viewer"]).await;

        let t1 = h.token_for("ana@example.com").await;
        let t2 = h.token_for("ana@example.com").await;
        assert!(h.service.authenticate(&t1).await.is_ok());
        assert!(h.service.authenticate(&t2).await.is_ok());

        let revocation = h.service.revoke_by_email(&h.admin, "ana@example.com").await.unwrap();
        assert_eq!(revocation.token_version, 2);

        assert_eq!(h.service.authenticate(&t1).await, Err(AuthError::InvalidToken));
        assert_eq!(h.service.authenticate(&t2).await, Err(AuthError::InvalidToken));

        let t3 = h.token_for("ana@example.com").await;
        assert!(h.service.authenticate(&t3).await.is_ok());
    }

    #[tokio::test]
    async fn revocation_leaves_other_identities_alone() {
        let h = Harness::new().await;
        h.create("ana@example.com", &["Viewer"]).await;
        h.create("bo@example.com", &["Viewer"]).await;

        let ana = h.token_for("ana@example.com").await;
        let bo = h.token_for("bo@example.com").await;

        h.service.revoke_by_email(&h.admin, "ana@example.com").await.unwrap();

        assert!(h.service.authenticate(&ana).await.is_err());
        assert!(h.service.authenticate(&bo).await.is_ok());
    }

    #[tokio::test]
    async fn revoke_own_signs_out_everywhere() {
        let h = Harness::new().await;
        h.create("ana@example.com", &[]).await;
        let token = h.token_for("ana@example.com").await;
        let ana = h.service.authenticate(&token).await.unwrap();

        h.service.revoke_own(&ana).await.unwrap();

        assert_eq!(h.service.authenticate(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn revoking_unknown_email_is_not_found() {
        let h = Harness::new().await;
        let err = h.service.revoke_by_email(&h.admin, "ghost@example.com").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_admin_cannot_revoke_others() {
        let h = Harness::new().await;
        let viewer = h.create("ana@example.com", &["Viewer"]).await;

        let err = h.service.revoke_by_email(&viewer, "admin@example.com").await.unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));
        assert_eq!(h.store.find_by_id(h.admin.id).await.unwrap().unwrap().token_version, 1);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let h = Harness::new().await;
        let ana = h.create("ana@example.com", &[]).await;

        let issued = TokenIssuer::new(&h.config).issue(&ana, Duration::seconds(-5)).unwrap();

        assert_eq!(h.service.authenticate(&issued.token).await, Err(AuthError::Expired));
    }

    #[tokio::test]
    async fn tampered_or_foreign_tokens_are_invalid() {
        let h = Harness::new().await;
        h.create("ana@example.com", &[]).await;
        let token = h.token_for("ana@example.com").await;

        // Flip one character of the signature segment.
        let mut tampered = token.clone().into_bytes();
        let last = tampered.len() - 2;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert_eq!(h.service.authenticate(&tampered).await, Err(AuthError::InvalidToken));

        let other = TokenConfig::new("some-other-secret-0123456789", Duration::minutes(5)).unwrap();
        let ana = h.store.find_by_email("ana@example.com").await.unwrap().unwrap();
        let foreign = TokenIssuer::new(&other).issue_default(&ana).unwrap();
        assert_eq!(h.service.authenticate(&foreign.token).await, Err(AuthError::InvalidToken));

        assert_eq!(h.service.authenticate("not-a-token").await, Err(AuthError::InvalidToken));
        assert_eq!(h.service.authenticate("").await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn token_without_version_stamp_is_invalid() {
        let h = Harness::new().await;
        let ana = h.create("ana@example.com", &[]).await;
        let now = Utc::now().timestamp();

        let token = jsonwebtoken::encode(
            &Header::default(),
            &json!({
                "sub": ana.id.to_string(),
                "email": ana.email,
                "roles": [],
                "iat": now,
                "exp": now + 600,
            }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(h.service.authenticate(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn token_for_unknown_subject_is_invalid() {
        let h = Harness::new().await;
        let ghost = Identity::new("ghost@example.com".into(), "Ghost".into(), PasswordHash::new("x"));

        let issued = TokenIssuer::new(&h.config).issue_default(&ghost).unwrap();

        assert_eq!(h.service.authenticate(&issued.token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn deleted_identity_token_is_invalid() {
        let h = Harness::new().await;
        let ana = h.create("ana@example.com", &[]).await;
        let token = h.token_for("ana@example.com").await;

        h.service.delete_identity(&h.admin, ana.id).await.unwrap();

        assert_eq!(h.service.authenticate(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn deactivation_blocks_live_tokens_and_login() {
        let h = Harness::new().await;
        let ana = h.create("ana@example.com", &["Viewer"]).await;
        let token = h.token_for("ana@example.com").await;

        h.service.set_active(&h.admin, ana.id, false).await.unwrap();

        assert_eq!(h.service.authenticate(&token).await, Err(AuthError::InactiveAccount));
        assert_eq!(
            h.service.login("ana@example.com", PASSWORD, None).await,
            Err(AuthError::InactiveAccount)
        );

        h.service.set_active(&h.admin, ana.id, true).await.unwrap();
        assert!(h.service.authenticate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let h = Harness::new().await;
        h.create("ana@example.com", &[]).await;

        assert_eq!(
            h.service.login("ana@example.com", "wrong", None).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            h.service.login("nobody@example.com", PASSWORD, None).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            h.service.login("not an email", PASSWORD, None).await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn admin_cannot_delete_or_deactivate_self() {
        let h = Harness::new().await;

        let err = h.service.delete_identity(&h.admin, h.admin.id).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidOperation(_)));

        let err = h.service.set_active(&h.admin, h.admin.id, false).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidOperation(_)));

        assert!(h.store.find_by_id(h.admin.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn role_changes_apply_on_next_request() {
        let h = Harness::new().await;
        let ana = h.create("ana@example.com", &["Viewer"]).await;
        let token = h.token_for("ana@example.com").await;

        let change = h.service.change_role(&h.admin, ana.id, "Operator", RoleAction::Add).await.unwrap();
        assert!(change.changed);
        let again = h.service.change_role(&h.admin, ana.id, "Operator", RoleAction::Add).await.unwrap();
        assert!(!again.changed);

        // Same token, fresh identity: the new role is visible without re-login.
        let identity = h.service.authenticate(&token).await.unwrap();
        assert!(authorize(&identity, "Operator").is_ok());

        h.service.change_role(&h.admin, ana.id, "Operator", RoleAction::Remove).await.unwrap();
        let identity = h.service.authenticate(&token).await.unwrap();
        assert!(authorize(&identity, "Operator").is_err());

        let err = h.service.change_role(&h.admin, ana.id, "Pilot", RoleAction::Add).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_identity_conflicts() {
        let h = Harness::new().await;
        h.create("ana@example.com", &[]).await;

        let err = h
            .service
            .create_identity(
                &h.admin,
                NewIdentity {
                    email: "Ana@Example.com".into(),
                    full_name: "Ana Again".into(),
                    password: PASSWORD.into(),
                    is_active: true,
                    roles: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_revocations_each_advance_the_version() {
        let h = Harness::new().await;
        let ana = h.create("ana@example.com", &[]).await;
        let store: Arc<dyn CredentialStore> = h.store.clone();
        let id = ana.id;

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { revoke_all(store.as_ref(), id).await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(h.store.find_by_id(ana.id).await.unwrap().unwrap().token_version, 33);
    }

    #[tokio::test]
    async fn service_runs_without_an_audit_trail() {
        let config = TokenConfig::new(SECRET, Duration::minutes(5)).unwrap();
        let store = Arc::new(InMemoryCredentialStore::new());
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash(PASSWORD).unwrap();
        store.create(IdentityDraft::new("solo@example.com", "Solo", hash)).await.unwrap();

        let service = AuthService::new(&config, store.clone(), Arc::new(hasher), Arc::new(NoopAuditSink)).unwrap();

        let outcome = service.login("solo@example.com", PASSWORD, None).await.unwrap();
        let identity = service.authenticate(&outcome.access_token).await.unwrap();
        assert_eq!(identity.email, "solo@example.com");
        assert!(identity.last_login_at.is_some());
    }

    #[tokio::test]
    async fn identity_created_inactive_never_accepts_a_login() {
        let h = Harness::new().await;
        let created = h
            .service
            .create_identity(
                &h.admin,
                NewIdentity {
                    email: "dormant@example.com".into(),
                    full_name: "Dormant".into(),
                    password: PASSWORD.into(),
                    is_active: false,
                    roles: vec!["Viewer".into()],
                },
            )
            .await
            .unwrap();

        assert!(!created.is_active);
        assert!(created.has_role("Viewer"));
        assert!(matches!(
            h.service.login("dormant@example.com", PASSWORD, None).await,
            Err(AuthError::InactiveAccount)
        ));
    }

    #[tokio::test]
    async fn create_identity_with_unknown_role_leaves_nothing_behind() {
        let h = Harness::new().await;
        let err = h
            .service
            .create_identity(
                &h.admin,
                NewIdentity {
                    email: "pilot@example.com".into(),
                    full_name: "Pilot".into(),
                    password: PASSWORD.into(),
                    is_active: true,
                    roles: vec!["Viewer".into(), "Pilot".into()],
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::NotFound(_)));
        assert!(h.store.find_by_email("pilot@example.com").await.unwrap().is_none());
    }
}
