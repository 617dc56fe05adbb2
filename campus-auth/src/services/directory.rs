//! Read-only access to the account directory.
//!
//! The directory (users, departments, module grants) is owned by the wider
//! CMS; this subsystem only loads the record needed to build an actor.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ActorRecord, ModulePermission};

#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<ActorRecord>, anyhow::Error>;
    async fn find_by_email(&self, email: &str) -> Result<Option<ActorRecord>, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    role: String,
    department_id: Option<Uuid>,
    college_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct PermissionRow {
    module: String,
    can_read: bool,
    can_write: bool,
    scope: Option<String>,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_record(&self, user: UserRow) -> Result<ActorRecord, anyhow::Error> {
        let rows: Vec<PermissionRow> = sqlx::query_as(
            "SELECT module, can_read, can_write, scope \
             FROM module_permissions WHERE user_id = $1 ORDER BY module",
        )
        .bind(user.user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut module_permissions = Vec::with_capacity(rows.len());
        for row in rows {
            let module = row
                .module
                .parse()
                .map_err(|e| anyhow::anyhow!("Corrupt grant for user {}: {}", user.user_id, e))?;
            let scope = row
                .scope
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(|e| anyhow::anyhow!("Corrupt grant for user {}: {}", user.user_id, e))?;
            module_permissions.push(ModulePermission {
                module,
                can_read: row.can_read,
                can_write: row.can_write,
                scope,
            });
        }

        let role = user
            .role
            .parse()
            .map_err(|e| anyhow::anyhow!("Corrupt role for user {}: {}", user.user_id, e))?;

        Ok(ActorRecord {
            user_id: user.user_id,
            email: user.email,
            role,
            department_id: user.department_id,
            college_id: user.college_id,
            module_permissions,
        })
    }
}

#[async_trait]
impl ActorDirectory for PgDirectory {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<ActorRecord>, anyhow::Error> {
        let user: Option<UserRow> = sqlx::query_as(
            "SELECT user_id, email, role, department_id, college_id \
             FROM users WHERE user_id = $1 AND active",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match user {
            Some(user) => Ok(Some(self.load_record(user).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<ActorRecord>, anyhow::Error> {
        let user: Option<UserRow> = sqlx::query_as(
            "SELECT user_id, email, role, department_id, college_id \
             FROM users WHERE email = $1 AND active",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match user {
            Some(user) => Ok(Some(self.load_record(user).await?)),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;
        Ok(())
    }
}

/// In-memory directory for tests.
#[derive(Default)]
pub struct MockDirectory {
    records: std::sync::Mutex<Vec<ActorRecord>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ActorRecord) {
        self.records
            .lock()
            .expect("records mutex poisoned")
            .push(record);
    }
}

#[async_trait]
impl ActorDirectory for MockDirectory {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<ActorRecord>, anyhow::Error> {
        Ok(self
            .records
            .lock()
            .expect("records mutex poisoned")
            .iter()
            .find(|r| r.user_id == user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<ActorRecord>, anyhow::Error> {
        Ok(self
            .records
            .lock()
            .expect("records mutex poisoned")
            .iter()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
