//! Credential lifecycle: access-token issuance and refresh-token rotation.
//!
//! Refresh tokens are opaque 32-byte random values handed to the caller once;
//! only their SHA-256 hash is persisted. Issuing a new refresh token revokes
//! the user's entire active cohort first (single-active-chain), and the store
//! contract makes that revoke-then-insert atomic.

use anyhow::Context;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::Error;
use crate::store::{RefreshTokenRecord, RefreshTokenStore};

use super::access::{
    sign_hs256, verify_hs256_allow_expired, AccessTokenClaims, TOKEN_VERSION,
};

/// Create a new opaque refresh token. The raw value is only ever returned to
/// the caller; the store sees a hash.
fn generate_refresh_token() -> Result<String, Error> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate refresh token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a refresh token so raw values never touch the store.
fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

pub struct CredentialService {
    tokens: Arc<dyn RefreshTokenStore>,
    signing_key: Vec<u8>,
    config: Arc<AuthConfig>,
}

impl CredentialService {
    #[must_use]
    pub fn new(
        tokens: Arc<dyn RefreshTokenStore>,
        signing_key: Vec<u8>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            tokens,
            signing_key,
            config,
        }
    }

    /// Issue a short-lived signed access token. No I/O.
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        roles: &[String],
    ) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            v: TOKEN_VERSION,
            iss: self.config.issuer().to_string(),
            aud: self.config.audience().to_string(),
            iat: now,
            exp: now + self.config.access_token_ttl_seconds(),
            jti: Uuid::new_v4().to_string(),
            sub: user_id.to_string(),
            email: email.to_string(),
            roles: roles.to_vec(),
        };
        sign_hs256(&self.signing_key, &claims)
            .map_err(|err| Error::Internal(anyhow::Error::new(err)))
    }

    /// Issue a fresh refresh token, revoking the user's currently-active
    /// cohort in the same atomic store operation.
    pub async fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, Error> {
        let token = generate_refresh_token()?;
        let now = Utc::now();
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_refresh_token(&token),
            expires_at: now + Duration::seconds(self.config.refresh_token_ttl_seconds()),
            revoked: false,
            created_at: now,
            revoked_at: None,
        };
        self.tokens.rotate(record).await?;
        info!(user = %user_id, "Rotated refresh token");
        Ok(token)
    }

    /// True iff a matching record exists and is unrevoked and unexpired.
    pub async fn validate_refresh_token(&self, token: &str) -> Result<bool, Error> {
        let record = self.tokens.find_by_hash(&hash_refresh_token(token)).await?;
        Ok(record.is_some_and(|record| record.is_active_at(Utc::now())))
    }

    /// Revoke one refresh token. Idempotent: unknown or already-revoked
    /// tokens are a no-op.
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<(), Error> {
        self.tokens.revoke(&hash_refresh_token(token)).await?;
        Ok(())
    }

    /// Revoke every active refresh token for the user (logout: no
    /// replacement is issued).
    pub async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> Result<(), Error> {
        self.tokens.revoke_all_for_user(user_id).await?;
        info!(user = %user_id, "Revoked all refresh tokens");
        Ok(())
    }

    /// Resolve the user behind an access token, checking signature, issuer,
    /// and audience but not expiry, so a just-expired token can still drive a
    /// refresh exchange. Any failure resolves to `None`.
    #[must_use]
    pub fn resolve_user_id_from_token(&self, access_token: &str) -> Option<Uuid> {
        let claims = verify_hs256_allow_expired(
            access_token,
            &self.signing_key,
            self.config.issuer(),
            self.config.audience(),
        )
        .ok()?;
        Uuid::parse_str(&claims.sub).ok()
    }
}
