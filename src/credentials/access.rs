//! HS256 access tokens.
//!
//! Compact JWT layout (`header.claims.signature`, base64url unpadded) with a
//! symmetric HMAC-SHA256 signature. Claims carry the user id, email, and role
//! names plus a unique `jti`. Verification checks the signature and standard
//! claims in a fixed order; a variant skips the expiry check so a just-expired
//! access token can still authorize a refresh exchange.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

pub const TOKEN_VERSION: u8 = 1;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenHeader {
    pub alg: String,
    pub typ: String,
}

impl AccessTokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    pub v: u8,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    /// User id.
    pub sub: String,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid key length")]
    KeyLength,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("invalid token version")]
    InvalidVersion,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Create an HS256 signed access token.
///
/// # Errors
///
/// Returns an error if the key is rejected by HMAC or the header/claims
/// cannot be encoded.
pub fn sign_hs256(key: &[u8], claims: &AccessTokenClaims) -> Result<String, TokenError> {
    let header_b64 = b64e_json(&AccessTokenHeader::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::KeyLength)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify an HS256 access token and return its decoded claims.
///
/// # Errors
///
/// Returns an error if the token is malformed, the signature does not match,
/// or the claims fail validation (`v`, `iss`, `aud`, `exp`).
pub fn verify_hs256(
    token: &str,
    key: &[u8],
    expected_issuer: &str,
    expected_audience: &str,
    now_unix_seconds: i64,
) -> Result<AccessTokenClaims, TokenError> {
    verify(token, key, expected_issuer, expected_audience, Some(now_unix_seconds))
}

/// Verify signature, issuer, and audience but deliberately skip the expiry
/// check. Used to resolve the user behind a possibly just-expired access
/// token during a refresh exchange.
///
/// # Errors
///
/// Same as [`verify_hs256`], minus `Expired`.
pub fn verify_hs256_allow_expired(
    token: &str,
    key: &[u8],
    expected_issuer: &str,
    expected_audience: &str,
) -> Result<AccessTokenClaims, TokenError> {
    verify(token, key, expected_issuer, expected_audience, None)
}

fn verify(
    token: &str,
    key: &[u8],
    expected_issuer: &str,
    expected_audience: &str,
    now_unix_seconds: Option<i64>,
) -> Result<AccessTokenClaims, TokenError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    if parts.next().is_some() {
        return Err(TokenError::TokenFormat);
    }

    let header: AccessTokenHeader = b64d_json(header_b64)?;
    if header.alg != "HS256" {
        return Err(TokenError::UnsupportedAlg(header.alg));
    }

    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::KeyLength)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let claims: AccessTokenClaims = b64d_json(claims_b64)?;
    if claims.v != TOKEN_VERSION {
        return Err(TokenError::InvalidVersion);
    }
    if claims.iss != expected_issuer {
        return Err(TokenError::InvalidIssuer);
    }
    if claims.aud != expected_audience {
        return Err(TokenError::InvalidAudience);
    }
    if let Some(now) = now_unix_seconds {
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"an-hs256-test-key-of-decent-size";
    const NOW: i64 = 1_700_000_000;

    fn test_claims() -> AccessTokenClaims {
        AccessTokenClaims {
            v: TOKEN_VERSION,
            iss: "https://id.example.test".to_string(),
            aud: "core".to_string(),
            iat: NOW,
            exp: NOW + 900,
            jti: "jti-1".to_string(),
            sub: "6f1c1a0a-9f6a-4a5e-8f9f-000000000001".to_string(),
            email: "alice@example.com".to_string(),
            roles: vec!["Admin".to_string(), "Support".to_string()],
        }
    }

    #[test]
    fn sign_and_verify_round_trip() -> Result<(), TokenError> {
        let token = sign_hs256(KEY, &test_claims())?;
        let claims = verify_hs256(&token, KEY, "https://id.example.test", "core", NOW)?;
        assert_eq!(claims, test_claims());
        Ok(())
    }

    #[test]
    fn rejects_wrong_key_and_tampered_payload() -> Result<(), TokenError> {
        let token = sign_hs256(KEY, &test_claims())?;

        let result = verify_hs256(&token, b"another-key", "https://id.example.test", "core", NOW);
        assert!(matches!(result, Err(TokenError::InvalidSignature)));

        let mut tampered = test_claims();
        tampered.roles.push("Owner".to_string());
        let claims_b64 = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&tampered)?);
        let mut parts = token.split('.');
        let header = parts.next().unwrap();
        let _claims = parts.next().unwrap();
        let sig = parts.next().unwrap();
        let forged = format!("{header}.{claims_b64}.{sig}");
        let result = verify_hs256(&forged, KEY, "https://id.example.test", "core", NOW);
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn rejects_expired_or_wrong_iss_aud() -> Result<(), TokenError> {
        let token = sign_hs256(KEY, &test_claims())?;

        let result = verify_hs256(&token, KEY, "https://id.example.test", "core", NOW + 9999);
        assert!(matches!(result, Err(TokenError::Expired)));

        let result = verify_hs256(&token, KEY, "https://other.test", "core", NOW);
        assert!(matches!(result, Err(TokenError::InvalidIssuer)));

        let result = verify_hs256(&token, KEY, "https://id.example.test", "wrong-aud", NOW);
        assert!(matches!(result, Err(TokenError::InvalidAudience)));
        Ok(())
    }

    #[test]
    fn allow_expired_skips_only_the_expiry_check() -> Result<(), TokenError> {
        let mut claims = test_claims();
        claims.exp = NOW - 1;
        let token = sign_hs256(KEY, &claims)?;

        let result = verify_hs256(&token, KEY, "https://id.example.test", "core", NOW);
        assert!(matches!(result, Err(TokenError::Expired)));

        let decoded =
            verify_hs256_allow_expired(&token, KEY, "https://id.example.test", "core")?;
        assert_eq!(decoded.sub, claims.sub);

        let result = verify_hs256_allow_expired(&token, KEY, "https://other.test", "core");
        assert!(matches!(result, Err(TokenError::InvalidIssuer)));
        Ok(())
    }

    #[test]
    fn rejects_malformed_tokens() {
        let result = verify_hs256("not-a-token", KEY, "iss", "aud", NOW);
        assert!(matches!(result, Err(TokenError::TokenFormat)));

        let result = verify_hs256("a.b.c.d", KEY, "iss", "aud", NOW);
        assert!(matches!(result, Err(TokenError::TokenFormat)));
    }
}
