//! Role hierarchy engine: catalog, comparisons, decisions, validation, and
//! the orchestration that composes them into atomic use-cases.

pub mod authorize;
pub mod catalog;
pub mod hierarchy;
pub mod service;
pub mod validate;

pub use authorize::RoleAuthorizer;
pub use catalog::RoleCatalog;
pub use hierarchy::RoleHierarchy;
pub use service::{CreateRole, RoleService, UpdateRole};
pub use validate::RoleValidator;
