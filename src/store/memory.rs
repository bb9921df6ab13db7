//! In-memory store implementations.
//!
//! Mutex-guarded state, good enough for tests and single-process embedding.
//! The refresh-token store's single mutex section per operation is what makes
//! `rotate` atomic here.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    Account, PasswordVerifier, RefreshTokenRecord, RefreshTokenStore, Role, RoleStore, User,
    UserStore,
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    accounts: Mutex<Vec<Account>>,
    passwords: Mutex<HashMap<Uuid, String>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User, password: &str) {
        self.passwords
            .lock()
            .await
            .insert(user.id, password.to_string());
        self.users.lock().await.push(user);
    }

    pub async fn add_account(&self, account: Account) {
        self.accounts.lock().await.push(account);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn active_accounts_of(&self, user_id: Uuid) -> Result<Vec<Account>> {
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .filter(|account| account.user_id == user_id && account.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PasswordVerifier for MemoryUserStore {
    // Plaintext comparison; this store exists for tests, not production.
    async fn verify(&self, user_id: Uuid, password: &str) -> Result<bool> {
        Ok(self
            .passwords
            .lock()
            .await
            .get(&user_id)
            .is_some_and(|stored| stored == password))
    }
}

#[derive(Default)]
pub struct MemoryRoleStore {
    roles: Mutex<Vec<Role>>,
    assignments: Mutex<Vec<(Uuid, String)>>,
}

impl MemoryRoleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_role(&self, role: Role) {
        self.roles.lock().await.push(role);
    }

    pub async fn add_assignment(&self, user_id: Uuid, role_name: &str) {
        self.assignments
            .lock()
            .await
            .push((user_id, role_name.to_string()));
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn list(&self) -> Result<Vec<Role>> {
        Ok(self.roles.lock().await.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .find(|role| role.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let name = name.trim();
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .find(|role| role.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn insert(&self, role: &Role) -> Result<()> {
        self.roles.lock().await.push(role.clone());
        Ok(())
    }

    async fn update(&self, role: &Role) -> Result<()> {
        let mut roles = self.roles.lock().await;
        if let Some(existing) = roles.iter_mut().find(|existing| existing.id == role.id) {
            *existing = role.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.roles.lock().await.retain(|role| role.id != id);
        Ok(())
    }

    async fn roles_of_user(&self, user_id: Uuid) -> Result<Vec<String>> {
        let assignments = self.assignments.lock().await;
        let mut roles: Vec<String> = Vec::new();
        for (id, role) in assignments.iter() {
            if *id == user_id && !roles.iter().any(|held| held.eq_ignore_ascii_case(role)) {
                roles.push(role.clone());
            }
        }
        Ok(roles)
    }

    async fn assign_to_user(&self, user_id: Uuid, role_name: &str) -> Result<()> {
        let mut assignments = self.assignments.lock().await;
        let held = assignments
            .iter()
            .any(|(id, role)| *id == user_id && role.eq_ignore_ascii_case(role_name));
        if !held {
            assignments.push((user_id, role_name.to_string()));
        }
        Ok(())
    }

    async fn remove_from_user(&self, user_id: Uuid, role_name: &str) -> Result<()> {
        self.assignments
            .lock()
            .await
            .retain(|(id, role)| !(*id == user_id && role.eq_ignore_ascii_case(role_name)));
        Ok(())
    }

    async fn assignment_count(&self, role_name: &str) -> Result<i64> {
        let assignments = self.assignments.lock().await;
        let count = assignments
            .iter()
            .filter(|(_, role)| role.eq_ignore_ascii_case(role_name))
            .count();
        Ok(count as i64)
    }

    async fn count_users_with_role(
        &self,
        role_name: &str,
        exclude_user: Option<Uuid>,
    ) -> Result<i64> {
        let assignments = self.assignments.lock().await;
        let count = assignments
            .iter()
            .filter(|(id, role)| {
                role.eq_ignore_ascii_case(role_name) && exclude_user != Some(*id)
            })
            .count();
        Ok(count as i64)
    }
}

#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    tokens: Mutex<Vec<RefreshTokenRecord>>,
}

impl MemoryRefreshTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record for a user, active or not.
    pub async fn records_for_user(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.tokens
            .lock()
            .await
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn rotate(&self, record: RefreshTokenRecord) -> Result<()> {
        // One mutex section covers revoke-then-insert, so concurrent rotations
        // for the same user serialize here.
        let mut tokens = self.tokens.lock().await;
        let now = Utc::now();
        for existing in tokens.iter_mut() {
            if existing.user_id == record.user_id && existing.is_active_at(now) {
                existing.revoked = true;
                existing.revoked_at = Some(now);
            }
        }
        tokens.push(record);
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &[u8]) -> Result<Option<RefreshTokenRecord>> {
        Ok(self
            .tokens
            .lock()
            .await
            .iter()
            .find(|record| record.token_hash == token_hash)
            .cloned())
    }

    async fn revoke(&self, token_hash: &[u8]) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        if let Some(record) = tokens
            .iter_mut()
            .find(|record| record.token_hash == token_hash && !record.revoked)
        {
            record.revoked = true;
            record.revoked_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        let now = Utc::now();
        for record in tokens.iter_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                record.revoked_at = Some(now);
            }
        }
        Ok(())
    }
}
