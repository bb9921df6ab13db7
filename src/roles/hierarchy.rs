//! Hierarchy comparisons over the merged role catalog.

use crate::error::Error;

use super::catalog::RoleCatalog;

#[derive(Clone)]
pub struct RoleHierarchy {
    catalog: RoleCatalog,
}

impl RoleHierarchy {
    #[must_use]
    pub fn new(catalog: RoleCatalog) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Hierarchy level of a role name (base level for unknown/inactive).
    pub async fn level_of(&self, role: &str) -> Result<i32, Error> {
        self.catalog.level_of(role).await
    }

    /// The role with the greatest hierarchy level in the set.
    ///
    /// Empty input resolves to the base role. Ties break lexicographically
    /// (ASCII case-insensitive) on the role name, so the result is
    /// deterministic regardless of input order.
    pub async fn highest_role(&self, roles: &[String]) -> Result<String, Error> {
        let mut best: Option<(String, i32)> = None;
        for role in roles {
            let level = self.catalog.level_of(role).await?;
            let better = match &best {
                None => true,
                Some((held, held_level)) => {
                    level > *held_level
                        || (level == *held_level
                            && role.to_ascii_lowercase() < held.to_ascii_lowercase())
                }
            };
            if better {
                best = Some((role.clone(), level));
            }
        }
        Ok(best.map_or_else(
            || self.catalog.table().base_role().to_string(),
            |(role, _)| role,
        ))
    }

    /// Strict comparison: `a` outranks `b`.
    pub async fn is_higher_than(&self, a: &str, b: &str) -> Result<bool, Error> {
        Ok(self.catalog.level_of(a).await? > self.catalog.level_of(b).await?)
    }

    /// Non-strict comparison: `a` is at least as high as `b`.
    pub async fn is_at_least_as_high_as(&self, a: &str, b: &str) -> Result<bool, Error> {
        Ok(self.catalog.level_of(a).await? >= self.catalog.level_of(b).await?)
    }

    /// All catalog roles (static and active dynamic) strictly below `role`.
    pub async fn subordinate_roles(&self, role: &str) -> Result<Vec<String>, Error> {
        let level = self.catalog.level_of(role).await?;
        let mut subordinates: Vec<String> = self
            .catalog
            .active_roles()
            .await?
            .into_iter()
            .filter(|(_, other)| *other < level)
            .map(|(name, _)| name)
            .collect();
        subordinates.sort();
        Ok(subordinates)
    }

    /// True if the name is a static role or an active dynamic role.
    pub async fn is_valid_role(&self, role: &str) -> Result<bool, Error> {
        self.catalog.is_valid_role(role).await
    }
}
