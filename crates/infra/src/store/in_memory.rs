use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_auth::{CredentialStore, Identity, IdentityDraft, Role, RoleName, StoreError};
use keyward_core::{IdentityId, RoleId};

#[derive(Debug, Default)]
struct State {
    identities: HashMap<IdentityId, Identity>,
    by_email: HashMap<String, IdentityId>,
    roles: BTreeMap<RoleName, Role>,
}

impl State {
    fn identity_mut(&mut self, id: IdentityId) -> Result<&mut Identity, StoreError> {
        self.identities
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("identity {id}")))
    }

    fn ensure_role(&self, name: &RoleName) -> Result<(), StoreError> {
        if self.roles.contains_key(name) {
            Ok(())
        } else {
            Err(StoreError::not_found(format!("role '{name}'")))
        }
    }
}

/// In-memory credential store for tests/dev.
///
/// Every mutation happens inside one write-lock critical section, which makes
/// `increment_version` a single atomic read-modify-write.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    state: RwLock<State>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let state = self.read()?;
        Ok(state
            .by_email
            .get(email)
            .and_then(|id| state.identities.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        Ok(self.read()?.identities.get(&id).cloned())
    }

    async fn list_identities(&self) -> Result<Vec<Identity>, StoreError> {
        let mut all: Vec<Identity> = self.read()?.identities.values().cloned().collect();
        all.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(all)
    }

    async fn create(&self, draft: IdentityDraft) -> Result<Identity, StoreError> {
        let mut state = self.write()?;
        if state.by_email.contains_key(&draft.email) {
            return Err(StoreError::conflict(format!("email '{}' is already registered", draft.email)));
        }
        for role in &draft.roles {
            state.ensure_role(role)?;
        }

        let identity = draft.into_identity();
        state.by_email.insert(identity.email.clone(), identity.id);
        state.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn delete(&self, id: IdentityId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let removed = state
            .identities
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(format!("identity {id}")))?;
        state.by_email.remove(&removed.email);
        Ok(())
    }

    async fn increment_version(&self, id: IdentityId) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        let identity = state.identity_mut(id)?;
        identity.token_version += 1;
        Ok(identity.token_version)
    }

    async fn set_active(&self, id: IdentityId, active: bool) -> Result<(), StoreError> {
        self.write()?.identity_mut(id)?.is_active = active;
        Ok(())
    }

    async fn record_login(&self, id: IdentityId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.write()?.identity_mut(id)?.last_login_at = Some(at);
        Ok(())
    }

    async fn set_roles(&self, id: IdentityId, roles: BTreeSet<RoleName>) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for role in &roles {
            state.ensure_role(role)?;
        }
        state.identity_mut(id)?.roles = roles;
        Ok(())
    }

    async fn add_role(&self, id: IdentityId, role: &RoleName) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        state.ensure_role(role)?;
        Ok(state.identity_mut(id)?.roles.insert(role.clone()))
    }

    async fn remove_role(&self, id: IdentityId, role: &RoleName) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        state.ensure_role(role)?;
        Ok(state.identity_mut(id)?.roles.remove(role))
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.read()?.roles.get(&RoleName::from(name)).cloned())
    }

    async fn insert_role(&self, name: &str, description: Option<&str>) -> Result<Role, StoreError> {
        let mut state = self.write()?;
        let key = RoleName::from(name);
        if state.roles.contains_key(&key) {
            return Err(StoreError::conflict(format!("role '{name}' already exists")));
        }

        let role = Role {
            id: RoleId::new(),
            name: key.clone(),
            description: description.map(str::to_string),
        };
        state.roles.insert(key, role.clone());
        Ok(role)
    }
}
