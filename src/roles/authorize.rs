//! Authorization decisions over a caller's role set.
//!
//! Every decision resolves the caller's highest role first, then compares
//! hierarchy levels. The top role (Owner) bypasses the strict comparison for
//! assignment, with one carve-out: nobody removes the top role through the
//! assignment path, Owners included.

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::Error;

use super::hierarchy::RoleHierarchy;

#[derive(Clone)]
pub struct RoleAuthorizer {
    hierarchy: RoleHierarchy,
    config: Arc<AuthConfig>,
}

impl RoleAuthorizer {
    #[must_use]
    pub fn new(hierarchy: RoleHierarchy, config: Arc<AuthConfig>) -> Self {
        Self { hierarchy, config }
    }

    fn is_top(&self, role: &str) -> bool {
        self.config
            .roles()
            .top_role()
            .eq_ignore_ascii_case(role.trim())
    }

    /// May the caller assign `target_role` to some user?
    ///
    /// Invalid targets are never assignable. The top role may assign anything;
    /// everyone else must strictly outrank the target.
    pub async fn can_assign_role(
        &self,
        caller_roles: &[String],
        target_role: &str,
    ) -> Result<bool, Error> {
        if !self.hierarchy.is_valid_role(target_role).await? {
            return Ok(false);
        }
        let highest = self.hierarchy.highest_role(caller_roles).await?;
        if self.is_top(&highest) {
            return Ok(true);
        }
        self.hierarchy.is_higher_than(&highest, target_role).await
    }

    /// May the caller remove `target_role` from some user?
    ///
    /// Same as assignment, except the top role itself is never removable via
    /// this path, not even by another holder of the top role.
    pub async fn can_remove_role(
        &self,
        caller_roles: &[String],
        target_role: &str,
    ) -> Result<bool, Error> {
        if !self.hierarchy.is_valid_role(target_role).await? {
            return Ok(false);
        }
        if self.is_top(target_role) {
            return Ok(false);
        }
        let highest = self.hierarchy.highest_role(caller_roles).await?;
        if self.is_top(&highest) {
            return Ok(true);
        }
        self.hierarchy.is_higher_than(&highest, target_role).await
    }

    /// Non-strict check: the caller's highest role is at least `required_role`.
    pub async fn has_sufficient_authority(
        &self,
        caller_roles: &[String],
        required_role: &str,
    ) -> Result<bool, Error> {
        let highest = self.hierarchy.highest_role(caller_roles).await?;
        self.hierarchy
            .is_at_least_as_high_as(&highest, required_role)
            .await
    }

    /// A new role's level must sit strictly below the caller's own authority.
    pub async fn can_create_role_with_hierarchy(
        &self,
        caller_roles: &[String],
        target_level: i32,
    ) -> Result<bool, Error> {
        let highest = self.hierarchy.highest_role(caller_roles).await?;
        Ok(self.hierarchy.level_of(&highest).await? > target_level)
    }

    /// Updating a role requires strictly outranking both its current and its
    /// proposed level.
    pub async fn can_update_role_with_hierarchy(
        &self,
        caller_roles: &[String],
        current_level: i32,
        new_level: i32,
    ) -> Result<bool, Error> {
        let highest = self.hierarchy.highest_role(caller_roles).await?;
        let level = self.hierarchy.level_of(&highest).await?;
        Ok(level > current_level && level > new_level)
    }

    /// Roles the caller may hand out: everything for the top role, otherwise
    /// the roles strictly below the caller's highest role.
    pub async fn assignable_roles(&self, caller_roles: &[String]) -> Result<Vec<String>, Error> {
        let highest = self.hierarchy.highest_role(caller_roles).await?;
        if self.is_top(&highest) {
            let mut roles: Vec<String> = self
                .hierarchy
                .catalog()
                .active_roles()
                .await?
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            roles.sort();
            return Ok(roles);
        }
        self.hierarchy.subordinate_roles(&highest).await
    }

    /// Role CRUD is gated behind the configured management threshold.
    pub async fn can_manage_roles(&self, caller_roles: &[String]) -> Result<bool, Error> {
        self.has_sufficient_authority(caller_roles, self.config.manage_roles_threshold())
            .await
    }

    /// User-role assignment is gated behind the configured assignment threshold.
    pub async fn can_manage_assignments(&self, caller_roles: &[String]) -> Result<bool, Error> {
        self.has_sufficient_authority(caller_roles, self.config.manage_assignments_threshold())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::RoleAuthorizer;
    use crate::config::{AuthConfig, RoleTable};
    use crate::roles::catalog::RoleCatalog;
    use crate::roles::hierarchy::RoleHierarchy;
    use crate::store::memory::MemoryRoleStore;
    use crate::store::Role;
    use anyhow::Result;
    use std::sync::Arc;
    use uuid::Uuid;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    async fn authorizer() -> RoleAuthorizer {
        let store = MemoryRoleStore::new();
        store
            .add_role(Role {
                id: Uuid::new_v4(),
                name: "auditor".to_string(),
                description: "read-only reviewer".to_string(),
                hierarchy_level: 10,
                is_system_role: false,
                is_active: true,
            })
            .await;
        let catalog = RoleCatalog::new(RoleTable::builtin(), Arc::new(store));
        RoleAuthorizer::new(RoleHierarchy::new(catalog), Arc::new(AuthConfig::new()))
    }

    #[tokio::test]
    async fn moderator_assigns_below_but_not_above() -> Result<()> {
        let authorizer = authorizer().await;
        let caller = roles(&["Moderator"]);
        assert!(!authorizer.can_assign_role(&caller, "Admin").await?);
        assert!(authorizer.can_assign_role(&caller, "Support").await?);
        Ok(())
    }

    #[tokio::test]
    async fn owner_assigns_anything_valid() -> Result<()> {
        let authorizer = authorizer().await;
        let caller = roles(&["Owner"]);
        assert!(authorizer.can_assign_role(&caller, "Owner").await?);
        assert!(authorizer.can_assign_role(&caller, "Admin").await?);
        assert!(authorizer.can_assign_role(&caller, "auditor").await?);
        assert!(!authorizer.can_assign_role(&caller, "nosuch").await?);
        Ok(())
    }

    #[tokio::test]
    async fn nobody_removes_the_top_role() -> Result<()> {
        let authorizer = authorizer().await;
        assert!(!authorizer.can_remove_role(&roles(&["Owner"]), "Owner").await?);
        assert!(!authorizer.can_remove_role(&roles(&["Admin"]), "Owner").await?);
        assert!(authorizer.can_remove_role(&roles(&["Owner"]), "Admin").await?);
        assert!(authorizer.can_remove_role(&roles(&["Admin"]), "Support").await?);
        Ok(())
    }

    #[tokio::test]
    async fn sufficient_authority_is_non_strict() -> Result<()> {
        let authorizer = authorizer().await;
        assert!(
            authorizer
                .has_sufficient_authority(&roles(&["Admin"]), "Admin")
                .await?
        );
        assert!(
            !authorizer
                .has_sufficient_authority(&roles(&["Support"]), "Admin")
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn create_and_update_require_strictly_higher_caller() -> Result<()> {
        let authorizer = authorizer().await;
        let admin = roles(&["Admin"]);
        assert!(authorizer.can_create_role_with_hierarchy(&admin, 79).await?);
        assert!(!authorizer.can_create_role_with_hierarchy(&admin, 80).await?);
        assert!(
            authorizer
                .can_update_role_with_hierarchy(&admin, 10, 15)
                .await?
        );
        assert!(
            !authorizer
                .can_update_role_with_hierarchy(&admin, 10, 80)
                .await?
        );
        assert!(
            !authorizer
                .can_update_role_with_hierarchy(&admin, 90, 10)
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn assignable_roles_for_owner_and_others() -> Result<()> {
        let authorizer = authorizer().await;
        let all = authorizer.assignable_roles(&roles(&["Owner"])).await?;
        assert_eq!(all.len(), 6);
        let below_moderator = authorizer.assignable_roles(&roles(&["Moderator"])).await?;
        assert_eq!(below_moderator, vec!["Support", "User", "auditor"]);
        Ok(())
    }

    #[tokio::test]
    async fn management_gates_use_thresholds() -> Result<()> {
        let authorizer = authorizer().await;
        assert!(authorizer.can_manage_roles(&roles(&["Admin"])).await?);
        assert!(!authorizer.can_manage_roles(&roles(&["Moderator"])).await?);
        assert!(
            authorizer
                .can_manage_assignments(&roles(&["Moderator"]))
                .await?
        );
        assert!(
            !authorizer
                .can_manage_assignments(&roles(&["Support"]))
                .await?
        );
        Ok(())
    }
}
