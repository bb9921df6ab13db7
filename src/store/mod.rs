//! Domain records and the collaborator seams the core consumes.
//!
//! The core never talks to a concrete database or password scheme directly.
//! It consumes a user store, a role store, a refresh-token store, and a
//! password verifier through the traits below; `memory` provides seedable
//! in-process implementations, `postgres` the sqlx-backed ones.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A user identity. Accounts and role assignments hang off this id.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
}

/// An account owned by a user. At most one account per user carries
/// `is_default`; the handshake enforces this, not the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub is_active: bool,
}

/// A role in the catalog. System roles come from the static table and are
/// mirrored here as immutable records; custom roles are store-owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub hierarchy_level: i32,
    pub is_system_role: bool,
    pub is_active: bool,
}

/// A persisted refresh token. Only the SHA-256 hash of the opaque value is
/// stored; the raw token exists solely in the caller's hands.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// A token is active while it is unrevoked and unexpired.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// Lookup capabilities over user identities and their accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Active accounts only; the handshake never offers disabled accounts.
    async fn active_accounts_of(&self, user_id: Uuid) -> Result<Vec<Account>>;
}

/// Password verification capability. The core never sees password material
/// beyond passing it through; the scheme (argon2, OPAQUE, ...) is the
/// implementor's concern.
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    async fn verify(&self, user_id: Uuid, password: &str) -> Result<bool>;
}

/// Persisted role catalog and user-role assignments.
///
/// Name lookups are case-insensitive. Implementations must enforce nothing
/// beyond storage consistency; authorization and validation gate every
/// mutation before it reaches the store.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Role>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>>;
    async fn insert(&self, role: &Role) -> Result<()>;
    async fn update(&self, role: &Role) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    /// Role names currently assigned to the user (unordered, deduplicated).
    async fn roles_of_user(&self, user_id: Uuid) -> Result<Vec<String>>;
    /// Idempotent: assigning an already-held role is a no-op.
    async fn assign_to_user(&self, user_id: Uuid, role_name: &str) -> Result<()>;
    async fn remove_from_user(&self, user_id: Uuid, role_name: &str) -> Result<()>;
    /// Number of users currently assigned the role.
    async fn assignment_count(&self, role_name: &str) -> Result<i64>;
    /// Number of users holding `role_name`, optionally excluding one user
    /// (self-update scenarios for the owner-count guard).
    async fn count_users_with_role(
        &self,
        role_name: &str,
        exclude_user: Option<Uuid>,
    ) -> Result<i64>;
}

/// Persisted refresh tokens.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Revoke every active token for `record.user_id`, then persist `record`,
    /// atomically. This is the single-active-chain rotation point; two
    /// concurrent calls for the same user must serialize.
    async fn rotate(&self, record: RefreshTokenRecord) -> Result<()>;
    async fn find_by_hash(&self, token_hash: &[u8]) -> Result<Option<RefreshTokenRecord>>;
    /// Idempotent: revoking an already-revoked or unknown hash is a no-op.
    async fn revoke(&self, token_hash: &[u8]) -> Result<()>;
    /// Revoke every active token for the user without issuing a replacement.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<()>;
}
