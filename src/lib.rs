//! # Gardisto (Role Hierarchy & Credential Lifecycle)
//!
//! `gardisto` is the authorization and credential core of an identity
//! backend. It decides who may manage whom through a numeric role hierarchy,
//! and it mints and rotates the tokens a session runs on.
//!
//! ## Role Hierarchy
//!
//! Five system roles (`Owner` 100, `Admin` 80, `Moderator` 60, `Support` 40,
//! `User` 20) are compile-time fixtures; custom roles slot in strictly below
//! the base level. Role names are case-insensitive everywhere. Authority is
//! strict: a caller can only hand out or take away roles ranked below their
//! own highest role, with the top role as the single exception.
//!
//! ## Credentials
//!
//! Access tokens are short-lived `HS256` JWTs carrying the user's role set.
//! Refresh tokens are opaque 32-byte secrets stored hash-only; each user has
//! a single active chain, and every issuance atomically revokes the previous
//! link.
//!
//! ## Login Handshake
//!
//! A verified password either issues credentials directly or, when the user
//! has several usable accounts, parks the session behind a single-use
//! ten-minute selection challenge. Failed logins are indistinguishable from
//! unknown emails.

pub mod config;
pub mod credentials;
pub mod error;
pub mod handshake;
pub mod roles;
pub mod store;

pub use config::{AuthConfig, RoleTable};
pub use credentials::CredentialService;
pub use error::{Error, Rule};
pub use handshake::{HandshakeService, IssuedTokens, LoginOutcome};
pub use roles::{CreateRole, RoleAuthorizer, RoleCatalog, RoleHierarchy, RoleService, UpdateRole};
