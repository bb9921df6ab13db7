//! Role orchestration: authorization gate, ordered validation, then mutation.
//!
//! Rejections happen before any write, so a failed use-case leaves the
//! catalog and assignment stores untouched. Owner assignment runs its
//! check-then-act under a mutex so two concurrent assignments cannot both
//! slip past the owner-count guard.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{Error, Rule};
use crate::store::{Role, RoleStore, UserStore};

use super::authorize::RoleAuthorizer;
use super::catalog::RoleCatalog;
use super::hierarchy::RoleHierarchy;
use super::validate::RoleValidator;

#[derive(Debug, Clone)]
pub struct CreateRole {
    pub name: String,
    pub description: String,
    pub hierarchy_level: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateRole {
    pub name: String,
    pub description: String,
    pub hierarchy_level: i32,
}

pub struct RoleService {
    catalog: RoleCatalog,
    authorizer: RoleAuthorizer,
    validator: RoleValidator,
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
    // Serializes the owner-count check-then-act within this process; the
    // Postgres store's advisory locks cover multi-process deployments.
    owner_guard: Mutex<()>,
}

impl RoleService {
    #[must_use]
    pub fn new(
        config: Arc<AuthConfig>,
        roles: Arc<dyn RoleStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let catalog = RoleCatalog::new(config.roles().clone(), roles.clone());
        let hierarchy = RoleHierarchy::new(catalog.clone());
        let authorizer = RoleAuthorizer::new(hierarchy, config.clone());
        let validator = RoleValidator::new(catalog.clone(), config);
        Self {
            catalog,
            authorizer,
            validator,
            roles,
            users,
            owner_guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn authorizer(&self) -> &RoleAuthorizer {
        &self.authorizer
    }

    /// Ordered validation shared by create and update: name required,
    /// description required, then the remaining name rules, then hierarchy.
    async fn validate_role_input(
        &self,
        name: &str,
        description: &str,
        hierarchy_level: i32,
        exclude: Option<Uuid>,
    ) -> Result<(), Error> {
        if name.trim().is_empty() {
            return Err(Rule::RoleNameRequired.into());
        }
        self.validator.validate_description(description)?;
        self.validator.validate_name(name, exclude).await?;
        self.validator.validate_hierarchy(hierarchy_level)?;
        Ok(())
    }

    pub async fn create_role(
        &self,
        caller_roles: &[String],
        request: CreateRole,
    ) -> Result<Role, Error> {
        if !self.authorizer.can_manage_roles(caller_roles).await? {
            return Err(Error::Unauthorized);
        }
        if !self
            .authorizer
            .can_create_role_with_hierarchy(caller_roles, request.hierarchy_level)
            .await?
        {
            return Err(Error::Unauthorized);
        }
        self.validate_role_input(
            &request.name,
            &request.description,
            request.hierarchy_level,
            None,
        )
        .await?;

        let role = Role {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description.trim().to_string(),
            hierarchy_level: request.hierarchy_level,
            is_system_role: false,
            is_active: true,
        };
        self.roles.insert(&role).await?;
        info!(role = %role.name, level = role.hierarchy_level, "Created role");
        Ok(role)
    }

    pub async fn update_role(
        &self,
        caller_roles: &[String],
        role_id: Uuid,
        request: UpdateRole,
    ) -> Result<Role, Error> {
        if !self.authorizer.can_manage_roles(caller_roles).await? {
            return Err(Error::Unauthorized);
        }
        let existing = self
            .roles
            .find_by_id(role_id)
            .await?
            .ok_or(Error::NotFound)?;
        self.validator.ensure_modifiable(&existing)?;
        if !self
            .authorizer
            .can_update_role_with_hierarchy(
                caller_roles,
                existing.hierarchy_level,
                request.hierarchy_level,
            )
            .await?
        {
            return Err(Error::Unauthorized);
        }
        self.validate_role_input(
            &request.name,
            &request.description,
            request.hierarchy_level,
            Some(role_id),
        )
        .await?;

        let updated = Role {
            name: request.name.trim().to_string(),
            description: request.description.trim().to_string(),
            hierarchy_level: request.hierarchy_level,
            ..existing
        };
        self.roles.update(&updated).await?;
        info!(role = %updated.name, level = updated.hierarchy_level, "Updated role");
        Ok(updated)
    }

    pub async fn delete_role(&self, caller_roles: &[String], role_id: Uuid) -> Result<(), Error> {
        if !self.authorizer.can_manage_roles(caller_roles).await? {
            return Err(Error::Unauthorized);
        }
        let role = self
            .roles
            .find_by_id(role_id)
            .await?
            .ok_or(Error::NotFound)?;
        self.validator.ensure_deletable(&role).await?;
        self.roles.delete(role_id).await?;
        info!(role = %role.name, "Deleted role");
        Ok(())
    }

    pub async fn assign_role_to_user(
        &self,
        caller_roles: &[String],
        user_id: Uuid,
        role_name: &str,
    ) -> Result<(), Error> {
        if !self.authorizer.can_manage_assignments(caller_roles).await? {
            return Err(Error::Unauthorized);
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(Error::NotFound);
        }
        if !self.catalog.is_valid_role(role_name).await? {
            return Err(Error::NotFound);
        }
        if !self
            .authorizer
            .can_assign_role(caller_roles, role_name)
            .await?
        {
            return Err(Error::Unauthorized);
        }

        let is_top = self
            .catalog
            .table()
            .top_role()
            .eq_ignore_ascii_case(role_name.trim());
        if is_top {
            // Guard and assignment happen under one lock; the count excludes
            // the target user so re-assignment stays a no-op.
            let _guard = self.owner_guard.lock().await;
            if !self.validator.can_assign_owner_role(Some(user_id)).await? {
                return Err(Rule::MaxOwnersExceeded.into());
            }
            self.roles.assign_to_user(user_id, role_name).await?;
        } else {
            self.roles.assign_to_user(user_id, role_name).await?;
        }
        info!(user = %user_id, role = role_name, "Assigned role");
        Ok(())
    }

    pub async fn remove_role_from_user(
        &self,
        caller_roles: &[String],
        user_id: Uuid,
        role_name: &str,
    ) -> Result<(), Error> {
        if !self.authorizer.can_manage_assignments(caller_roles).await? {
            return Err(Error::Unauthorized);
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(Error::NotFound);
        }
        if !self.catalog.is_valid_role(role_name).await? {
            return Err(Error::NotFound);
        }
        if !self
            .authorizer
            .can_remove_role(caller_roles, role_name)
            .await?
        {
            return Err(Error::Unauthorized);
        }
        self.roles.remove_from_user(user_id, role_name).await?;
        info!(user = %user_id, role = role_name, "Removed role");
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, Error> {
        Ok(self.roles.list().await?)
    }

    pub async fn get_role_by_id(&self, role_id: Uuid) -> Result<Role, Error> {
        self.roles
            .find_by_id(role_id)
            .await?
            .ok_or(Error::NotFound)
    }

    pub async fn get_role_by_name(&self, name: &str) -> Result<Role, Error> {
        self.roles.find_by_name(name).await?.ok_or(Error::NotFound)
    }

    /// Stored assignments only; implicit base-role authority is resolved by
    /// the hierarchy, not reported here.
    pub async fn roles_of_user(&self, user_id: Uuid) -> Result<Vec<String>, Error> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(Error::NotFound);
        }
        Ok(self.roles.roles_of_user(user_id).await?)
    }

    pub async fn assignable_roles(&self, caller_roles: &[String]) -> Result<Vec<String>, Error> {
        self.authorizer.assignable_roles(caller_roles).await
    }
}
