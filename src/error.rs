//! Typed failure taxonomy shared by the role and credential services.
//!
//! Business-rule violations carry a stable machine-readable code plus a human
//! message so the HTTP layer can map them without string matching. Unexpected
//! lower-level failures (store unavailable, crypto failure) surface as
//! `Internal` and are never folded into a business outcome.

use thiserror::Error;

/// Stable business-rule identifiers for role mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    RoleNameRequired,
    RoleDescriptionRequired,
    RoleNameInvalid,
    SystemRoleNameReserved,
    RoleNameNotUnique,
    InvalidHierarchyLevel,
    SystemRoleNotModifiable,
    SystemRoleNotDeletable,
    RoleHasAssignedUsers,
    MaxOwnersExceeded,
}

impl Rule {
    /// Machine-readable code, stable across releases.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::RoleNameRequired => "ROLE_NAME_REQUIRED",
            Self::RoleDescriptionRequired => "ROLE_DESCRIPTION_REQUIRED",
            Self::RoleNameInvalid => "ROLE_NAME_INVALID",
            Self::SystemRoleNameReserved => "SYSTEM_ROLE_NAME_RESERVED",
            Self::RoleNameNotUnique => "ROLE_NAME_NOT_UNIQUE",
            Self::InvalidHierarchyLevel => "INVALID_HIERARCHY_LEVEL",
            Self::SystemRoleNotModifiable => "SYSTEM_ROLE_NOT_MODIFIABLE",
            Self::SystemRoleNotDeletable => "SYSTEM_ROLE_NOT_DELETABLE",
            Self::RoleHasAssignedUsers => "ROLE_HAS_ASSIGNED_USERS",
            Self::MaxOwnersExceeded => "MAX_OWNERS_EXCEEDED",
        }
    }

    /// Human-readable message for logs and error bodies.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::RoleNameRequired => "role name is required",
            Self::RoleDescriptionRequired => "role description is required",
            Self::RoleNameInvalid => "role name must be alphanumeric with '_' or '-'",
            Self::SystemRoleNameReserved => "role name is reserved for a system role",
            Self::RoleNameNotUnique => "a role with this name already exists",
            Self::InvalidHierarchyLevel => "hierarchy level is outside the allowed range",
            Self::SystemRoleNotModifiable => "system roles cannot be modified",
            Self::SystemRoleNotDeletable => "system roles cannot be deleted",
            Self::RoleHasAssignedUsers => "role still has assigned users",
            Self::MaxOwnersExceeded => "maximum number of owners reached",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Caller lacks the hierarchy/authority for the action, or password or
    /// token-subject verification failed. Intentionally carries no detail.
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("{}", .0.message())]
    Rule(Rule),
    /// Refresh token absent/expired/revoked, or access token failed
    /// signature/issuer/audience checks.
    #[error("invalid credential")]
    InvalidCredential,
    #[error("selection challenge expired or already consumed")]
    ChallengeExpiredOrConsumed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<Rule> for Error {
    fn from(rule: Rule) -> Self {
        Self::Rule(rule)
    }
}
