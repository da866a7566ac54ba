//! Postgres-backed credential store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |
//!
//! ## Token versions
//!
//! `increment_version` locks the identity row (`SELECT ... FOR UPDATE`) inside
//! a transaction before writing the new value, so concurrent revocations
//! serialize on the row and none of them is lost.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use keyward_auth::{CredentialStore, Identity, IdentityDraft, PasswordHash, Role, RoleName, StoreError};
use keyward_core::{IdentityId, RoleId};

const SCHEMA: &str = include_str!("../../migrations/0001_credentials.sql");

const SELECT_IDENTITY: &str = r#"
    SELECT
        i.id,
        i.email,
        i.full_name,
        i.password_hash,
        i.is_active,
        i.token_version,
        i.created_at,
        i.last_login_at,
        COALESCE(
            array_agg(r.name ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL),
            ARRAY[]::TEXT[]
        ) AS roles
    FROM identities i
    LEFT JOIN identity_roles ir ON ir.identity_id = i.id
    LEFT JOIN roles r ON r.id = ir.role_id
"#;

#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Apply the (idempotent) schema.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn role_id(
        tx: &mut Transaction<'_, Postgres>,
        name: &RoleName,
    ) -> Result<uuid::Uuid, StoreError> {
        sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM roles WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("role_id", e))?
            .ok_or_else(|| StoreError::not_found(format!("role '{name}'")))
    }

    /// Lock the identity row for the rest of the transaction.
    async fn lock_identity(tx: &mut Transaction<'_, Postgres>, id: IdentityId) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT token_version FROM identities WHERE id = $1 FOR UPDATE")
            .bind(*id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("lock_identity", e))?
            .ok_or_else(|| StoreError::not_found(format!("identity {id}")))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    async fn fetch_identity(&self, filter: &str, bind: IdentityKey<'_>) -> Result<Option<Identity>, StoreError> {
        let sql = format!("{SELECT_IDENTITY} WHERE {filter} GROUP BY i.id");
        let query = sqlx::query(&sql);
        let query = match bind {
            IdentityKey::Id(id) => query.bind(*id.as_uuid()),
            IdentityKey::Email(email) => query.bind(email),
        };

        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_identity", e))?;

        row.map(|row| identity_from_row(&row)).transpose()
    }
}

enum IdentityKey<'a> {
    Id(IdentityId),
    Email(&'a str),
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        self.fetch_identity("i.email = $1", IdentityKey::Email(email)).await
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        self.fetch_identity("i.id = $1", IdentityKey::Id(id)).await
    }

    #[instrument(skip(self), err)]
    async fn list_identities(&self) -> Result<Vec<Identity>, StoreError> {
        let sql = format!("{SELECT_IDENTITY} GROUP BY i.id ORDER BY i.email");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_identities", e))?;

        rows.iter().map(identity_from_row).collect()
    }

    #[instrument(skip(self, draft), fields(email = %draft.email), err)]
    async fn create(&self, draft: IdentityDraft) -> Result<Identity, StoreError> {
        let identity = draft.into_identity();
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO identities (id, email, full_name, password_hash, is_active, token_version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*identity.id.as_uuid())
        .bind(&identity.email)
        .bind(&identity.full_name)
        .bind(identity.password_hash.as_str())
        .bind(identity.is_active)
        .bind(version_to_db(identity.token_version)?)
        .bind(identity.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_identity", e))?;

        for role in &identity.roles {
            let role_id = Self::role_id(&mut tx, role).await?;
            sqlx::query("INSERT INTO identity_roles (identity_id, role_id) VALUES ($1, $2)")
                .bind(*identity.id.as_uuid())
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_identity_role", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(identity)
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn delete(&self, id: IdentityId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_identity", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("identity {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn increment_version(&self, id: IdentityId) -> Result<u64, StoreError> {
        let mut tx = self.begin().await?;

        let current = Self::lock_identity(&mut tx, id).await?;
        let next = current + 1;

        sqlx::query("UPDATE identities SET token_version = $2, updated_at = NOW() WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(next)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("increment_version", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        version_from_db(next)
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn set_active(&self, id: IdentityId, active: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE identities SET is_active = $2, updated_at = NOW() WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(active)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_active", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("identity {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn record_login(&self, id: IdentityId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE identities SET last_login_at = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("record_login", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("identity {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(identity_id = %id, role_count = roles.len()), err)]
    async fn set_roles(&self, id: IdentityId, roles: BTreeSet<RoleName>) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        Self::lock_identity(&mut tx, id).await?;

        let mut role_ids = Vec::with_capacity(roles.len());
        for role in &roles {
            role_ids.push(Self::role_id(&mut tx, role).await?);
        }

        sqlx::query("DELETE FROM identity_roles WHERE identity_id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_roles", e))?;

        for role_id in role_ids {
            sqlx::query("INSERT INTO identity_roles (identity_id, role_id) VALUES ($1, $2)")
                .bind(*id.as_uuid())
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_identity_role", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(identity_id = %id, role = %role), err)]
    async fn add_role(&self, id: IdentityId, role: &RoleName) -> Result<bool, StoreError> {
        let mut tx = self.begin().await?;
        Self::lock_identity(&mut tx, id).await?;
        let role_id = Self::role_id(&mut tx, role).await?;

        let result = sqlx::query(
            "INSERT INTO identity_roles (identity_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(*id.as_uuid())
        .bind(role_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("add_role", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(identity_id = %id, role = %role), err)]
    async fn remove_role(&self, id: IdentityId, role: &RoleName) -> Result<bool, StoreError> {
        let mut tx = self.begin().await?;
        Self::lock_identity(&mut tx, id).await?;
        let role_id = Self::role_id(&mut tx, role).await?;

        let result = sqlx::query("DELETE FROM identity_roles WHERE identity_id = $1 AND role_id = $2")
            .bind(*id.as_uuid())
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_role", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query("SELECT id, name, description FROM roles ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;

        rows.iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn find_role(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query("SELECT id, name, description FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role", e))?;

        row.as_ref().map(role_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn insert_role(&self, name: &str, description: Option<&str>) -> Result<Role, StoreError> {
        let role = Role {
            id: RoleId::new(),
            name: RoleName::from(name),
            description: description.map(str::to_string),
        };

        sqlx::query("INSERT INTO roles (id, name, description) VALUES ($1, $2, $3)")
            .bind(*role.id.as_uuid())
            .bind(role.name.as_str())
            .bind(role.description.as_deref())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;

        Ok(role)
    }
}

fn identity_from_row(row: &sqlx::postgres::PgRow) -> Result<Identity, StoreError> {
    let decode = |e: sqlx::Error| StoreError::backend(format!("failed to decode identity row: {e}"));

    let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
    let password_hash: String = row.try_get("password_hash").map_err(decode)?;
    let token_version: i64 = row.try_get("token_version").map_err(decode)?;
    let roles: Vec<String> = row.try_get("roles").map_err(decode)?;

    Ok(Identity {
        id: IdentityId::from_uuid(id),
        email: row.try_get("email").map_err(decode)?,
        full_name: row.try_get("full_name").map_err(decode)?,
        password_hash: PasswordHash::new(password_hash),
        is_active: row.try_get("is_active").map_err(decode)?,
        token_version: version_from_db(token_version)?,
        roles: roles.into_iter().map(RoleName::from).collect(),
        created_at: row.try_get("created_at").map_err(decode)?,
        last_login_at: row.try_get("last_login_at").map_err(decode)?,
    })
}

fn role_from_row(row: &sqlx::postgres::PgRow) -> Result<Role, StoreError> {
    let decode = |e: sqlx::Error| StoreError::backend(format!("failed to decode role row: {e}"));

    let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    Ok(Role {
        id: RoleId::from_uuid(id),
        name: RoleName::from(name),
        description: row.try_get("description").map_err(decode)?,
    })
}

fn version_from_db(raw: i64) -> Result<u64, StoreError> {
    u64::try_from(raw).map_err(|_| StoreError::backend(format!("negative token_version {raw}")))
}

fn version_to_db(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::backend(format!("token_version {version} out of range")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::backend(format!("connection pool closed in {operation}")),
        other => StoreError::backend(format!("sqlx error in {operation}: {other}")),
    }
}
