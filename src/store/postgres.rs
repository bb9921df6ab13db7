//! sqlx/Postgres implementations of the store traits.
//!
//! Every statement runs inside a `db.query` span. Multi-statement mutations
//! use transactions; refresh-token rotation additionally takes a per-user
//! advisory lock so the single-active-chain invariant holds across processes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    Account, RefreshTokenRecord, RefreshTokenStore, Role, RoleStore, User, UserStore,
};

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = "SELECT id, email, is_active FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user by id")?;
        Ok(row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            is_active: row.get("is_active"),
        }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = "SELECT id, email, is_active FROM users WHERE lower(email) = lower($1)";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user by email")?;
        Ok(row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            is_active: row.get("is_active"),
        }))
    }

    async fn active_accounts_of(&self, user_id: Uuid) -> Result<Vec<Account>> {
        let query = r"
            SELECT id, user_id, name, is_default, is_active
            FROM accounts
            WHERE user_id = $1
              AND is_active
            ORDER BY is_default DESC, name
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list active accounts")?;
        Ok(rows
            .into_iter()
            .map(|row| Account {
                id: row.get("id"),
                user_id: row.get("user_id"),
                name: row.get("name"),
                is_default: row.get("is_default"),
                is_active: row.get("is_active"),
            })
            .collect())
    }
}

#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn role_from_row(row: &sqlx::postgres::PgRow) -> Role {
    Role {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        hierarchy_level: row.get("hierarchy_level"),
        is_system_role: row.get("is_system_role"),
        is_active: row.get("is_active"),
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn list(&self) -> Result<Vec<Role>> {
        let query = r"
            SELECT id, name, description, hierarchy_level, is_system_role, is_active
            FROM roles
            ORDER BY hierarchy_level DESC, name
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list roles")?;
        Ok(rows.iter().map(role_from_row).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>> {
        let query = r"
            SELECT id, name, description, hierarchy_level, is_system_role, is_active
            FROM roles
            WHERE id = $1
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup role by id")?;
        Ok(row.as_ref().map(role_from_row))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let query = r"
            SELECT id, name, description, hierarchy_level, is_system_role, is_active
            FROM roles
            WHERE lower(name) = lower($1)
        ";
        let row = sqlx::query(query)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup role by name")?;
        Ok(row.as_ref().map(role_from_row))
    }

    async fn insert(&self, role: &Role) -> Result<()> {
        let query = r"
            INSERT INTO roles
                (id, name, description, hierarchy_level, is_system_role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        sqlx::query(query)
            .bind(role.id)
            .bind(&role.name)
            .bind(&role.description)
            .bind(role.hierarchy_level)
            .bind(role.is_system_role)
            .bind(role.is_active)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert role")?;
        Ok(())
    }

    async fn update(&self, role: &Role) -> Result<()> {
        let query = r"
            UPDATE roles
            SET name = $2,
                description = $3,
                hierarchy_level = $4,
                is_active = $5,
                updated_at = NOW()
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(role.id)
            .bind(&role.name)
            .bind(&role.description)
            .bind(role.hierarchy_level)
            .bind(role.is_active)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update role")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let query = "DELETE FROM roles WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete role")?;
        Ok(())
    }

    async fn roles_of_user(&self, user_id: Uuid) -> Result<Vec<String>> {
        let query = "SELECT DISTINCT role_name FROM user_roles WHERE user_id = $1";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list roles of user")?;
        Ok(rows.into_iter().map(|row| row.get("role_name")).collect())
    }

    async fn assign_to_user(&self, user_id: Uuid, role_name: &str) -> Result<()> {
        let query = r"
            INSERT INTO user_roles (user_id, role_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_name) DO NOTHING
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(role_name)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to assign role")?;
        Ok(())
    }

    async fn remove_from_user(&self, user_id: Uuid, role_name: &str) -> Result<()> {
        let query = r"
            DELETE FROM user_roles
            WHERE user_id = $1
              AND lower(role_name) = lower($2)
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(role_name)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to remove role")?;
        Ok(())
    }

    async fn assignment_count(&self, role_name: &str) -> Result<i64> {
        let query = r"
            SELECT COUNT(DISTINCT user_id) AS count
            FROM user_roles
            WHERE lower(role_name) = lower($1)
        ";
        let row = sqlx::query(query)
            .bind(role_name)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to count role assignments")?;
        Ok(row.get("count"))
    }

    async fn count_users_with_role(
        &self,
        role_name: &str,
        exclude_user: Option<Uuid>,
    ) -> Result<i64> {
        let query = r"
            SELECT COUNT(DISTINCT user_id) AS count
            FROM user_roles
            WHERE lower(role_name) = lower($1)
              AND ($2::uuid IS NULL OR user_id <> $2)
        ";
        let row = sqlx::query(query)
            .bind(role_name)
            .bind(exclude_user)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to count users with role")?;
        Ok(row.get("count"))
    }
}

#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn token_from_row(row: &sqlx::postgres::PgRow) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token_hash: row.get("token_hash"),
        expires_at: row.get("expires_at"),
        revoked: row.get("revoked"),
        created_at: row.get("created_at"),
        revoked_at: row.get("revoked_at"),
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn rotate(&self, record: RefreshTokenRecord) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin rotation transaction")?;

        // Per-user advisory lock released at commit; serializes concurrent
        // rotations so exactly one chain stays active.
        let query = "SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))";
        sqlx::query(query)
            .bind(record.user_id)
            .execute(&mut *tx)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to take rotation lock")?;

        let query = r"
            UPDATE refresh_tokens
            SET revoked = TRUE,
                revoked_at = NOW()
            WHERE user_id = $1
              AND NOT revoked
              AND expires_at > NOW()
        ";
        sqlx::query(query)
            .bind(record.user_id)
            .execute(&mut *tx)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to revoke active tokens")?;

        let query = r"
            INSERT INTO refresh_tokens
                (id, user_id, token_hash, expires_at, revoked, created_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        ";
        sqlx::query(query)
            .bind(record.id)
            .bind(record.user_id)
            .bind(&record.token_hash)
            .bind(record.expires_at)
            .bind(record.revoked)
            .bind(record.created_at)
            .bind(record.revoked_at)
            .execute(&mut *tx)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert refresh token")?;

        tx.commit().await.context("commit rotation transaction")?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &[u8]) -> Result<Option<RefreshTokenRecord>> {
        let query = r"
            SELECT id, user_id, token_hash, expires_at, revoked, created_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup refresh token")?;
        Ok(row.as_ref().map(token_from_row))
    }

    async fn revoke(&self, token_hash: &[u8]) -> Result<()> {
        // Idempotent; matching zero rows is fine.
        let query = r"
            UPDATE refresh_tokens
            SET revoked = TRUE,
                revoked_at = NOW()
            WHERE token_hash = $1
              AND NOT revoked
        ";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to revoke refresh token")?;
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<()> {
        let query = r"
            UPDATE refresh_tokens
            SET revoked = TRUE,
                revoked_at = NOW()
            WHERE user_id = $1
              AND NOT revoked
        ";
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to revoke user refresh tokens")?;
        Ok(())
    }
}
