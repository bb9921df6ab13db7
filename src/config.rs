//! Service configuration and the injected static role table.
//!
//! The built-in system roles form a fixed table compiled into the default
//! config. The table is a plain value injected at construction time rather
//! than a global so tests can swap in their own hierarchy.

use std::time::Duration;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_SELECTION_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_MAX_OWNERS: i64 = 3;
const DEFAULT_ROLE_NAME_MIN: usize = 3;
const DEFAULT_ROLE_NAME_MAX: usize = 50;
const DEFAULT_ISSUER: &str = "https://api.gardisto.dev";
const DEFAULT_AUDIENCE: &str = "gardisto";

/// Immutable table of system roles and their hierarchy levels.
///
/// Higher level means more authority. Lookups are case-insensitive; the
/// canonical spelling is whatever the table was built with.
#[derive(Clone, Debug)]
pub struct RoleTable {
    roles: Vec<(String, i32)>,
    base: String,
    top: String,
}

impl RoleTable {
    /// The built-in five-role hierarchy.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            ("Owner".to_string(), 100),
            ("Admin".to_string(), 80),
            ("Moderator".to_string(), 60),
            ("Support".to_string(), 40),
            ("User".to_string(), 20),
        ])
    }

    /// Build a table from `(name, level)` pairs. The lowest level becomes the
    /// base role (default authority), the highest becomes the top role.
    ///
    /// # Panics
    ///
    /// Panics if `roles` is empty; a role table without a base role cannot
    /// resolve any authority decision.
    #[must_use]
    pub fn new(roles: Vec<(String, i32)>) -> Self {
        assert!(!roles.is_empty(), "role table requires at least one role");
        let base = roles
            .iter()
            .min_by_key(|(_, level)| *level)
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        let top = roles
            .iter()
            .max_by_key(|(_, level)| *level)
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        Self { roles, base, top }
    }

    /// Hierarchy level of a system role, or `None` for unknown names.
    #[must_use]
    pub fn level_of(&self, name: &str) -> Option<i32> {
        let name = name.trim();
        self.roles
            .iter()
            .find(|(role, _)| role.eq_ignore_ascii_case(name))
            .map(|(_, level)| *level)
    }

    /// Whether `name` is one of the reserved system roles.
    #[must_use]
    pub fn is_system_role(&self, name: &str) -> bool {
        self.level_of(name).is_some()
    }

    /// Canonical spelling of a system role name, if known.
    #[must_use]
    pub fn canonical(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.roles
            .iter()
            .find(|(role, _)| role.eq_ignore_ascii_case(name))
            .map(|(role, _)| role.as_str())
    }

    /// The base role every user implicitly holds (lowest level).
    #[must_use]
    pub fn base_role(&self) -> &str {
        &self.base
    }

    /// Hierarchy level of the base role.
    #[must_use]
    pub fn base_level(&self) -> i32 {
        self.level_of(&self.base).unwrap_or(0)
    }

    /// The top role (highest level); subject to the owner-count guard.
    #[must_use]
    pub fn top_role(&self) -> &str {
        &self.top
    }

    /// All `(name, level)` pairs in the table.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.roles.iter().map(|(name, level)| (name.as_str(), *level))
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    issuer: String,
    audience: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
    selection_ttl_seconds: u64,
    max_owners: i64,
    role_name_min: usize,
    role_name_max: usize,
    manage_roles_threshold: String,
    manage_assignments_threshold: String,
    roles: RoleTable,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            selection_ttl_seconds: DEFAULT_SELECTION_TTL_SECONDS,
            max_owners: DEFAULT_MAX_OWNERS,
            role_name_min: DEFAULT_ROLE_NAME_MIN,
            role_name_max: DEFAULT_ROLE_NAME_MAX,
            manage_roles_threshold: "Admin".to_string(),
            manage_assignments_threshold: "Moderator".to_string(),
            roles: RoleTable::builtin(),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_selection_ttl_seconds(mut self, seconds: u64) -> Self {
        self.selection_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_owners(mut self, max: i64) -> Self {
        self.max_owners = max;
        self
    }

    #[must_use]
    pub fn with_role_name_bounds(mut self, min: usize, max: usize) -> Self {
        self.role_name_min = min;
        self.role_name_max = max;
        self
    }

    #[must_use]
    pub fn with_manage_roles_threshold(mut self, role: String) -> Self {
        self.manage_roles_threshold = role;
        self
    }

    #[must_use]
    pub fn with_manage_assignments_threshold(mut self, role: String) -> Self {
        self.manage_assignments_threshold = role;
        self
    }

    #[must_use]
    pub fn with_role_table(mut self, roles: RoleTable) -> Self {
        self.roles = roles;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_seconds
    }

    /// TTL for account-selection challenges.
    #[must_use]
    pub fn selection_ttl(&self) -> Duration {
        Duration::from_secs(self.selection_ttl_seconds)
    }

    #[must_use]
    pub fn max_owners(&self) -> i64 {
        self.max_owners
    }

    #[must_use]
    pub fn role_name_min(&self) -> usize {
        self.role_name_min
    }

    #[must_use]
    pub fn role_name_max(&self) -> usize {
        self.role_name_max
    }

    /// Minimum role required to create/update/delete roles.
    #[must_use]
    pub fn manage_roles_threshold(&self) -> &str {
        &self.manage_roles_threshold
    }

    /// Minimum role required to assign or remove roles from users.
    #[must_use]
    pub fn manage_assignments_threshold(&self) -> &str {
        &self.manage_assignments_threshold
    }

    #[must_use]
    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthConfig, RoleTable};

    #[test]
    fn builtin_table_levels() {
        let table = RoleTable::builtin();
        assert_eq!(table.level_of("Owner"), Some(100));
        assert_eq!(table.level_of("admin"), Some(80));
        assert_eq!(table.level_of("MODERATOR"), Some(60));
        assert_eq!(table.level_of("Support"), Some(40));
        assert_eq!(table.level_of("user"), Some(20));
        assert_eq!(table.level_of("nosuch"), None);
    }

    #[test]
    fn base_and_top_roles_derived_from_levels() {
        let table = RoleTable::builtin();
        assert_eq!(table.base_role(), "User");
        assert_eq!(table.base_level(), 20);
        assert_eq!(table.top_role(), "Owner");
    }

    #[test]
    fn canonical_restores_table_spelling() {
        let table = RoleTable::builtin();
        assert_eq!(table.canonical(" owner "), Some("Owner"));
        assert_eq!(table.canonical("nosuch"), None);
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config = AuthConfig::new();
        assert_eq!(config.access_token_ttl_seconds(), 15 * 60);
        assert_eq!(config.selection_ttl().as_secs(), 10 * 60);
        assert_eq!(config.max_owners(), 3);
        assert_eq!(config.manage_roles_threshold(), "Admin");
        assert_eq!(config.manage_assignments_threshold(), "Moderator");

        let config = config
            .with_issuer("https://id.test".to_string())
            .with_audience("core".to_string())
            .with_max_owners(1)
            .with_role_name_bounds(2, 10)
            .with_selection_ttl_seconds(42);
        assert_eq!(config.issuer(), "https://id.test");
        assert_eq!(config.audience(), "core");
        assert_eq!(config.max_owners(), 1);
        assert_eq!(config.role_name_min(), 2);
        assert_eq!(config.role_name_max(), 10);
        assert_eq!(config.selection_ttl().as_secs(), 42);
    }
}
