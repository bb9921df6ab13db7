//! Login handshake: password verification, account selection, logout.

pub mod challenge;
pub mod service;

pub use challenge::SelectionChallenges;
pub use service::{HandshakeService, IssuedTokens, LoginOutcome};
