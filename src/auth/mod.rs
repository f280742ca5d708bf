//! Token service: signed session tokens, opaque secrets for email
//! verification, and password hashing.
//!
//! Session tokens are stateless HS256 JWTs carrying the user id and an
//! absolute expiry. There is no server-side session store, so expiry is the
//! only bound on a token's lifetime; logout only clears the cookie.

pub mod guard;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Why a session token failed verification. Handlers collapse all of these to
/// a 401, but the distinction is kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("no session token present")]
    Missing,
    #[error("session token malformed or badly signed")]
    Malformed,
    #[error("session token expired")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// User id the token was issued for
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issue a signed session token for a user id.
pub fn issue_session_token(
    user_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a session token and return the user id it was issued for.
pub fn verify_session_token(token: Option<&str>, secret: &str) -> Result<String, TokenError> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return Err(TokenError::Missing),
    };

    let mut validation = Validation::default();
    validation.leeway = 0;

    match decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims.sub),
        Err(err) => match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
            _ => Err(TokenError::Malformed),
        },
    }
}

/// Generate a random opaque secret (32 bytes, hex) for out-of-band flows.
/// Returned once to be emailed; only its hash is ever stored.
pub fn generate_opaque_secret() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash an opaque secret for storage. Deterministic, so a later comparison
/// never needs the original value.
pub fn hash_opaque_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a presented secret against a stored hash in constant time.
pub fn verify_opaque_secret(secret: &str, stored_hash: &str) -> bool {
    let computed = hash_opaque_secret(secret);
    computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Build the session cookie carrying a freshly issued token. The cookie lives
/// for a fixed 24 hours regardless of the TTL embedded in the token itself.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(true)
        .max_age(time::Duration::hours(24))
        .build()
}

/// Build an empty, already-expired session cookie. Logout is client-side
/// only: a raw token replayed outside the cookie stays valid until expiry.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(true)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-signing-secret";

    #[test]
    fn test_session_token_round_trip() {
        let token = issue_session_token("user-123", SECRET, Duration::hours(24)).unwrap();
        let subject = verify_session_token(Some(&token), SECRET).unwrap();
        assert_eq!(subject, "user-123");
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_session_token("user-123", SECRET, Duration::seconds(-5)).unwrap();
        assert_eq!(
            verify_session_token(Some(&token), SECRET),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_missing_token_rejected() {
        assert_eq!(verify_session_token(None, SECRET), Err(TokenError::Missing));
        assert_eq!(
            verify_session_token(Some(""), SECRET),
            Err(TokenError::Missing)
        );
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert_eq!(
            verify_session_token(Some("not-a-jwt"), SECRET),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_session_token("user-123", SECRET, Duration::hours(1)).unwrap();
        assert_eq!(
            verify_session_token(Some(&token), "another-secret"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_opaque_secret_hash_is_deterministic() {
        let secret = generate_opaque_secret();
        assert_eq!(hash_opaque_secret(&secret), hash_opaque_secret(&secret));
    }

    #[test]
    fn test_opaque_secrets_are_unique_and_long() {
        let a = generate_opaque_secret();
        let b = generate_opaque_secret();
        assert_ne!(a, b);
        // 32 bytes hex-encoded
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_verify_opaque_secret() {
        let secret = generate_opaque_secret();
        let stored = hash_opaque_secret(&secret);
        assert!(verify_opaque_secret(&secret, &stored));
        assert!(!verify_opaque_secret("wrong-secret", &stored));
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-valid-hash"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));

        let cleared = expired_session_cookie();
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
    }
}
