//! Invariant checks gating role mutations.
//!
//! These predicates only read; the orchestration service runs them before any
//! write so a rejection never leaves partial state.

use regex::Regex;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{Error, Rule};
use crate::store::Role;

use super::catalog::RoleCatalog;

#[derive(Clone)]
pub struct RoleValidator {
    catalog: RoleCatalog,
    config: Arc<AuthConfig>,
}

impl RoleValidator {
    #[must_use]
    pub fn new(catalog: RoleCatalog, config: Arc<AuthConfig>) -> Self {
        Self { catalog, config }
    }

    /// Basic format check: alphanumeric plus `_`/`-`, already trimmed.
    fn well_formed(name: &str) -> bool {
        Regex::new(r"^[A-Za-z0-9_-]+$").is_ok_and(|regex| regex.is_match(name))
    }

    /// Name rules in rejection order: required, format/length, reserved,
    /// unique. `exclude` skips one role id so updates don't collide with
    /// themselves.
    pub async fn validate_name(&self, name: &str, exclude: Option<Uuid>) -> Result<(), Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Rule::RoleNameRequired.into());
        }
        if name.len() < self.config.role_name_min()
            || name.len() > self.config.role_name_max()
            || !Self::well_formed(name)
        {
            return Err(Rule::RoleNameInvalid.into());
        }
        if self.catalog.table().is_system_role(name) {
            return Err(Rule::SystemRoleNameReserved.into());
        }
        let existing = self.catalog.store().find_by_name(name).await?;
        if let Some(existing) = existing {
            if exclude != Some(existing.id) {
                return Err(Rule::RoleNameNotUnique.into());
            }
        }
        Ok(())
    }

    pub fn validate_description(&self, description: &str) -> Result<(), Error> {
        if description.trim().is_empty() {
            return Err(Rule::RoleDescriptionRequired.into());
        }
        Ok(())
    }

    /// Custom roles live strictly below the base role: `[0, base_level)`.
    pub fn validate_hierarchy(&self, level: i32) -> Result<(), Error> {
        if level < 0 || level >= self.config.roles().base_level() {
            return Err(Rule::InvalidHierarchyLevel.into());
        }
        Ok(())
    }

    /// System roles are immutable.
    pub fn ensure_modifiable(&self, role: &Role) -> Result<(), Error> {
        if role.is_system_role {
            return Err(Rule::SystemRoleNotModifiable.into());
        }
        Ok(())
    }

    /// System roles are undeletable; other roles need zero assignments.
    pub async fn ensure_deletable(&self, role: &Role) -> Result<(), Error> {
        if role.is_system_role {
            return Err(Rule::SystemRoleNotDeletable.into());
        }
        let assigned = self.catalog.store().assignment_count(&role.name).await?;
        if assigned > 0 {
            return Err(Rule::RoleHasAssignedUsers.into());
        }
        Ok(())
    }

    /// Owner-count guard: holders of the top role (optionally excluding one
    /// user) must stay strictly below the configured maximum for one more
    /// assignment to fit.
    pub async fn can_assign_owner_role(
        &self,
        exclude_user: Option<Uuid>,
    ) -> Result<bool, Error> {
        let top = self.catalog.table().top_role();
        let holders = self
            .catalog
            .store()
            .count_users_with_role(top, exclude_user)
            .await?;
        Ok(holders < self.config.max_owners())
    }
}

#[cfg(test)]
mod tests {
    use super::RoleValidator;
    use crate::config::{AuthConfig, RoleTable};
    use crate::error::{Error, Rule};
    use crate::roles::catalog::RoleCatalog;
    use crate::store::memory::MemoryRoleStore;
    use crate::store::Role;
    use anyhow::Result;
    use std::sync::Arc;
    use uuid::Uuid;

    fn assert_rule(result: Result<(), Error>, rule: Rule) {
        match result {
            Err(Error::Rule(actual)) => assert_eq!(actual, rule),
            other => panic!("expected rule {rule:?}, got {other:?}"),
        }
    }

    async fn validator_with_store() -> (RoleValidator, Arc<MemoryRoleStore>) {
        let store = Arc::new(MemoryRoleStore::new());
        let catalog = RoleCatalog::new(RoleTable::builtin(), store.clone());
        (
            RoleValidator::new(catalog, Arc::new(AuthConfig::new())),
            store,
        )
    }

    #[tokio::test]
    async fn name_rules_reject_in_order() -> Result<()> {
        let (validator, store) = validator_with_store().await;
        assert_rule(
            validator.validate_name("  ", None).await,
            Rule::RoleNameRequired,
        );
        assert_rule(
            validator.validate_name("a", None).await,
            Rule::RoleNameInvalid,
        );
        assert_rule(
            validator.validate_name("has space", None).await,
            Rule::RoleNameInvalid,
        );
        assert_rule(
            validator.validate_name("admin", None).await,
            Rule::SystemRoleNameReserved,
        );

        store
            .add_role(Role {
                id: Uuid::new_v4(),
                name: "auditor".to_string(),
                description: "existing".to_string(),
                hierarchy_level: 10,
                is_system_role: false,
                is_active: true,
            })
            .await;
        assert_rule(
            validator.validate_name("Auditor", None).await,
            Rule::RoleNameNotUnique,
        );
        assert!(validator.validate_name("reviewer", None).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn uniqueness_excludes_the_role_being_updated() -> Result<()> {
        let (validator, store) = validator_with_store().await;
        let id = Uuid::new_v4();
        store
            .add_role(Role {
                id,
                name: "auditor".to_string(),
                description: "existing".to_string(),
                hierarchy_level: 10,
                is_system_role: false,
                is_active: true,
            })
            .await;
        assert!(validator.validate_name("auditor", Some(id)).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn hierarchy_must_sit_below_the_base_role() -> Result<()> {
        let (validator, _) = validator_with_store().await;
        assert!(validator.validate_hierarchy(0).is_ok());
        assert!(validator.validate_hierarchy(19).is_ok());
        assert_rule(validator.validate_hierarchy(20), Rule::InvalidHierarchyLevel);
        assert_rule(validator.validate_hierarchy(-1), Rule::InvalidHierarchyLevel);
        Ok(())
    }

    #[tokio::test]
    async fn system_roles_are_immutable_and_undeletable() -> Result<()> {
        let (validator, _) = validator_with_store().await;
        let system = Role {
            id: Uuid::new_v4(),
            name: "Admin".to_string(),
            description: "system".to_string(),
            hierarchy_level: 80,
            is_system_role: true,
            is_active: true,
        };
        assert_rule(
            validator.ensure_modifiable(&system),
            Rule::SystemRoleNotModifiable,
        );
        assert_rule(
            validator.ensure_deletable(&system).await,
            Rule::SystemRoleNotDeletable,
        );
        Ok(())
    }

    #[tokio::test]
    async fn deletion_requires_zero_assignments() -> Result<()> {
        let (validator, store) = validator_with_store().await;
        let role = Role {
            id: Uuid::new_v4(),
            name: "auditor".to_string(),
            description: "custom".to_string(),
            hierarchy_level: 10,
            is_system_role: false,
            is_active: true,
        };
        store.add_role(role.clone()).await;
        store.add_assignment(Uuid::new_v4(), "auditor").await;
        assert_rule(
            validator.ensure_deletable(&role).await,
            Rule::RoleHasAssignedUsers,
        );
        Ok(())
    }

    #[tokio::test]
    async fn owner_guard_counts_and_excludes() -> Result<()> {
        let (validator, store) = validator_with_store().await;
        let holders: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for holder in &holders {
            store.add_assignment(*holder, "Owner").await;
        }
        // Max is 3 and 3 users already hold Owner.
        assert!(!validator.can_assign_owner_role(None).await?);
        // Excluding an existing holder makes room for their own re-assignment.
        assert!(validator.can_assign_owner_role(Some(holders[0])).await?);
        Ok(())
    }
}
