//! Merged role catalog: static system roles plus store-backed custom roles.
//!
//! Callers resolve names and levels through one interface instead of
//! branching on role kind. Static roles always win a name collision; unknown
//! or inactive roles fall back to the base level so authority never resolves
//! above what the catalog can vouch for.

use std::sync::Arc;

use crate::config::RoleTable;
use crate::error::Error;
use crate::store::RoleStore;

#[derive(Clone)]
pub struct RoleCatalog {
    table: RoleTable,
    store: Arc<dyn RoleStore>,
}

impl RoleCatalog {
    #[must_use]
    pub fn new(table: RoleTable, store: Arc<dyn RoleStore>) -> Self {
        Self { table, store }
    }

    #[must_use]
    pub fn table(&self) -> &RoleTable {
        &self.table
    }

    pub(crate) fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    /// Hierarchy level of a role name. Static lookup first, then the dynamic
    /// catalog; unknown or inactive roles resolve to the base level.
    pub async fn level_of(&self, name: &str) -> Result<i32, Error> {
        if let Some(level) = self.table.level_of(name) {
            return Ok(level);
        }
        let role = self.store.find_by_name(name).await?;
        Ok(match role {
            Some(role) if role.is_active => role.hierarchy_level,
            _ => self.table.base_level(),
        })
    }

    /// True for static roles and for active dynamic roles.
    pub async fn is_valid_role(&self, name: &str) -> Result<bool, Error> {
        if self.table.is_system_role(name) {
            return Ok(true);
        }
        let role = self.store.find_by_name(name).await?;
        Ok(role.is_some_and(|role| role.is_active))
    }

    /// All resolvable roles as `(name, level)` pairs: the static table plus
    /// active dynamic roles. Static roles shadow same-named dynamic ones.
    pub async fn active_roles(&self) -> Result<Vec<(String, i32)>, Error> {
        let mut roles: Vec<(String, i32)> = self
            .table
            .iter()
            .map(|(name, level)| (name.to_string(), level))
            .collect();
        for role in self.store.list().await? {
            if role.is_active && !self.table.is_system_role(&role.name) {
                roles.push((role.name, role.hierarchy_level));
            }
        }
        Ok(roles)
    }
}
