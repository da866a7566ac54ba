//! Service wiring: credential store selection, audit sinks, provisioning.

use std::sync::Arc;

use tracing::{info, warn};

use keyward_auth::{Argon2Hasher, AuditSink, AuthError, AuthService, CredentialStore, TokenConfig};
use keyward_infra::audit::{FanoutAuditSink, InMemoryAuditLog, TracingAuditSink};
use keyward_infra::config::AppConfig;
use keyward_infra::seed::{bootstrap_admin, seed_role_catalog};
use keyward_infra::store::{InMemoryCredentialStore, PostgresCredentialStore};

pub struct AppServices {
    pub auth: Arc<AuthService>,
    /// Backs `GET /admin/audit-logs`; every event also goes to tracing.
    pub audit_log: Arc<InMemoryAuditLog>,
}

impl AppServices {
    pub fn new(token: &TokenConfig, store: Arc<dyn CredentialStore>) -> Result<Self, AuthError> {
        let audit_log = Arc::new(InMemoryAuditLog::default());
        let sinks: Vec<Arc<dyn AuditSink>> = vec![audit_log.clone(), Arc::new(TracingAuditSink)];
        let sink = FanoutAuditSink::new(sinks);

        let auth = AuthService::new(token, store, Arc::new(Argon2Hasher::new()), Arc::new(sink))?;

        Ok(Self {
            auth: Arc::new(auth),
            audit_log,
        })
    }
}

/// Build services from configuration: pick the store, seed roles, and create
/// the bootstrap administrator if one is configured.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            info!("using postgres credential store");
            Arc::new(PostgresCredentialStore::connect(url).await?)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    seed_role_catalog(store.as_ref()).await?;

    let services = AppServices::new(&config.token, store.clone())?;

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(store.as_ref(), services.auth.hasher().clone(), admin).await?;
    }

    Ok(services)
}
