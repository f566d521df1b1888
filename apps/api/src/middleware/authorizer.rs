//! Request authorization: finds the caller's token and resolves it to a user.
//!
//! Token sources, first present wins (never merged):
//! 1. `auth_token` cookie
//! 2. legacy `auth-token` cookie
//! 3. `Authorization: Bearer <token>` header

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::{debug, error};

use crate::auth::cookies::{read_cookie, AUTH_COOKIE, LEGACY_AUTH_COOKIE};
use crate::auth::{AuthError, SessionService};
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    read_cookie(headers, AUTH_COOKIE)
        .or_else(|| read_cookie(headers, LEGACY_AUTH_COOKIE))
        .or_else(|| bearer_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the request's token to a live user. Every failure, including a
/// store outage, comes back as `None`.
pub async fn authorize(sessions: &SessionService, headers: &HeaderMap) -> Option<User> {
    let token = extract_token(headers)?;
    match sessions.verify_session(token).await {
        Ok(user) => Some(user),
        Err(AuthError::Internal(e)) => {
            error!("session verification failed, treating as unauthenticated: {e}");
            None
        }
        Err(e) => {
            debug!("session rejected: {e}");
            None
        }
    }
}

/// Authenticated caller. Use as a handler argument on any protected route.
/// Rejection is a 401; a token that was sent but refused also gets its cookie
/// cleared.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// The token that authenticated this request.
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(AppError::unauthenticated)?
            .to_string();
        let user = authorize(&state.sessions, &parts.headers)
            .await
            .ok_or_else(|| AppError::session_rejected(state.config.secure_cookies()))?;
        Ok(AuthUser { user, token })
    }
}

/// Presence of a token, without verifying it. Logout only needs to know
/// which session row to delete.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_token(&parts.headers)
            .map(|token| SessionToken(token.to_string()))
            .ok_or_else(AppError::unauthenticated)
    }
}
