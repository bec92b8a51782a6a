//! Password hashing and token issuance.
//!
//! Access tokens are compact HMAC-SHA256 signed payloads
//! (`base64url(json).base64url(signature)`) carrying the user id and an
//! expiry. Refresh tokens are opaque random values stored server-side so
//! they can be revoked.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Refresh token revoked or unknown")]
    RefreshRejected,

    #[error("Email already registered")]
    EmailTaken,

    #[error("User account is inactive")]
    Inactive,

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Hash a password with argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// User id the token was issued for.
    sub: i64,
    /// Expiry, unix seconds.
    exp: i64,
}

/// Issues and verifies signed access tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    access_ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, access_ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            access_ttl,
        }
    }

    /// Issue an access token for a user, valid from `now`.
    pub fn issue(&self, user_id: i64, now: DateTime<Utc>) -> Result<String> {
        let claims = TokenClaims {
            sub: user_id,
            exp: (now + self.access_ttl).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|e| AuthError::Hash(e.to_string()))?;
        let encoded = URL_SAFE_NO_PAD.encode(&payload);
        let signature = self.sign(encoded.as_bytes())?;
        Ok(format!("{}.{}", encoded, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify a token and return the user id it was issued for.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<i64> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::InvalidToken)?;

        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        let expected = self.sign(payload.as_bytes())?;
        if expected.ct_eq(&presented).unwrap_u8() != 1 {
            return Err(AuthError::InvalidToken);
        }

        let decoded = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: TokenClaims =
            serde_json::from_slice(&decoded).map_err(|_| AuthError::InvalidToken)?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims.sub)
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Opaque refresh token value: a random UUID plus a random suffix. The
/// database column is unique; the value itself carries no claims.
pub fn generate_refresh_token() -> String {
    use rand::Rng;
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("{}{}", uuid::Uuid::new_v4().simple(), suffix)
}
