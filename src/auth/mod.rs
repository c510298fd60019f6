//! Session and credential handling.
//!
//! Sessions are HS256 tokens carried in an HttpOnly cookie. Email
//! verification and password reset use the same signing key with a
//! purpose claim so one token kind can never stand in for another.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "uniconf_session";
const SESSION_TTL_SECS: i64 = 12 * 3600;
const EMAIL_TOKEN_TTL_SECS: i64 = 1800;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Please verify your email address before logging in")]
    EmailNotVerified,
    #[error("Invalid or expired token")]
    TokenInvalid,
    #[error("Password hashing failed")]
    Hash,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotVerified => StatusCode::FORBIDDEN,
            AuthError::Hash => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AuthError::Hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i64,
    pub name: String,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerify,
    PasswordReset,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurposeClaims {
    pub sub: i64,
    pub purpose: TokenPurpose,
    pub exp: i64,
}

pub fn issue_session_token(
    secret: &str,
    user_id: i64,
    name: &str,
    is_admin: bool,
    is_super_admin: bool,
) -> Result<String, AuthError> {
    let claims = SessionClaims {
        sub: user_id,
        name: name.to_string(),
        is_admin,
        is_super_admin,
        exp: chrono::Utc::now().timestamp() + SESSION_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::TokenInvalid)
}

pub fn verify_session_token(secret: &str, token: &str) -> Result<SessionClaims, AuthError> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::TokenInvalid)
}

pub fn issue_purpose_token(
    secret: &str,
    user_id: i64,
    purpose: TokenPurpose,
) -> Result<String, AuthError> {
    let claims = PurposeClaims {
        sub: user_id,
        purpose,
        exp: chrono::Utc::now().timestamp() + EMAIL_TOKEN_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::TokenInvalid)
}

/// Decodes a purpose-scoped token; a mismatched purpose is as invalid as a
/// bad signature.
pub fn verify_purpose_token(
    secret: &str,
    token: &str,
    expected: TokenPurpose,
) -> Result<i64, AuthError> {
    let data = decode::<PurposeClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::TokenInvalid)?;

    if data.claims.purpose != expected {
        return Err(AuthError::TokenInvalid);
    }
    Ok(data.claims.sub)
}

pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE)
}

/// The authenticated identity a request carries. The flags mirror the
/// users table at login time; admin routes re-check against the table.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub name: String,
    pub is_admin: bool,
    pub is_super_admin: bool,
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    let raw = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = Arc::<AppState>::from_ref(state);
        let token = cookie_value(parts, SESSION_COOKIE).ok_or(ApiError::LoginRequired)?;
        let claims = verify_session_token(&app.config.secret_key, &token)
            .map_err(|_| ApiError::LoginRequired)?;

        Ok(CurrentUser {
            user_id: claims.sub,
            name: claims.name,
            is_admin: claims.is_admin,
            is_super_admin: claims.is_super_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn session_token_roundtrip() {
        let token = issue_session_token("key", 42, "Ada", true, false).unwrap();
        let claims = verify_session_token("key", &token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.name, "Ada");
        assert!(claims.is_admin);
        assert!(!claims.is_super_admin);
    }

    #[test]
    fn session_token_rejects_wrong_key() {
        let token = issue_session_token("key", 1, "Ada", false, false).unwrap();
        assert!(verify_session_token("other", &token).is_err());
    }

    #[test]
    fn purpose_tokens_are_not_interchangeable() {
        let token = issue_purpose_token("key", 7, TokenPurpose::EmailVerify).unwrap();
        assert_eq!(
            verify_purpose_token("key", &token, TokenPurpose::EmailVerify).unwrap(),
            7
        );
        assert!(verify_purpose_token("key", &token, TokenPurpose::PasswordReset).is_err());
    }
}
