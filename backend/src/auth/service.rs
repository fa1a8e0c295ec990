//! Password hashing, token issuance and cookie construction.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use time::Duration as CookieDuration;

use crate::auth::models::Claims;
use crate::database::models::User;
use crate::errors::ApiError;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

const ACCESS_TTL_SECS: i64 = 60 * 60;
const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
/// How long a password reset code stays usable.
pub const RESET_CODE_TTL_SECS: i64 = 10 * 60;

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn issue_token(user: &User, secret: &str, ttl_secs: i64) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_hex(),
        role: user.role,
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

pub fn issue_access_token(user: &User, secret: &str) -> Result<String, ApiError> {
    issue_token(user, secret, ACCESS_TTL_SECS)
}

pub fn issue_refresh_token(user: &User, secret: &str) -> Result<String, ApiError> {
    issue_token(user, secret, REFRESH_TTL_SECS)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))
}

fn auth_cookie(name: &'static str, value: String, max_age: CookieDuration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .build()
}

pub fn access_cookie(token: String) -> Cookie<'static> {
    auth_cookie(ACCESS_COOKIE, token, CookieDuration::seconds(ACCESS_TTL_SECS))
}

pub fn refresh_cookie(token: String) -> Cookie<'static> {
    auth_cookie(
        REFRESH_COOKIE,
        token,
        CookieDuration::seconds(REFRESH_TTL_SECS),
    )
}

/// Expired cookie used to clear a session on logout.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    auth_cookie(name, String::new(), CookieDuration::ZERO)
}

/// Random 32-byte code, hex encoded, mailed to the user for password reset.
pub fn generate_reset_code() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;

    fn test_user() -> User {
        User::new(
            "Test User".into(),
            "user@example.com".into(),
            "hash".into(),
            "0500000000".into(),
            Role::User,
        )
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let user = test_user();
        let token = issue_access_token(&user, "secret").unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.to_hex());
        assert_eq!(claims.role, Role::User);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let user = test_user();
        let token = issue_access_token(&user, "secret").unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn cookies_are_http_only_and_strict() {
        let cookie = access_cookie("tok".into());
        assert_eq!(cookie.name(), ACCESS_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn reset_codes_are_unique_hex() {
        let a = generate_reset_code();
        let b = generate_reset_code();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reset_code_expires_after_ten_minutes() {
        assert_eq!(RESET_CODE_TTL_SECS, 600);
        assert!(RESET_CODE_TTL_SECS < ACCESS_TTL_SECS);
    }
}
