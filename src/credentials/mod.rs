//! Signed access tokens and the refresh-token lifecycle.

pub mod access;
pub mod service;

pub use access::{
    sign_hs256, verify_hs256, verify_hs256_allow_expired, AccessTokenClaims, AccessTokenHeader,
    TokenError, TOKEN_VERSION,
};
pub use service::CredentialService;
