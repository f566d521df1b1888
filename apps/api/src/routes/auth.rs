//! Axum route handlers for `/api/auth`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::auth::cookies::{clear_session_cookie, session_cookie};
use crate::auth::validation::{
    parse_login, parse_password_change, parse_registration, CredentialsBody, PasswordChangeBody,
};
use crate::errors::AppError;
use crate::middleware::{AuthUser, SessionToken};
use crate::models::user::User;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let Json(body) = payload?;
    let credentials = parse_registration(body).map_err(AppError::Validation)?;

    let user = state.sessions.register(&credentials).await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// POST /api/auth/login
///
/// Returns the token in the body and sets it as the `auth_token` cookie.
pub async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = payload?;
    let credentials = parse_login(body).map_err(AppError::Validation)?;

    let outcome = state.sessions.login(&credentials).await?;
    let cookie = session_cookie(&outcome.token.token, state.config.secure_cookies());

    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            user: outcome.user,
            token: outcome.token.token,
        }),
    ))
}

/// POST /api/auth/logout
///
/// Succeeds for any presented token, live or not; 401 only when none is sent.
pub async fn handle_logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, AppError> {
    let success = state.sessions.logout(&token).await?;
    Ok((
        [(SET_COOKIE, clear_session_cookie(state.config.secure_cookies()))],
        Json(SuccessResponse { success }),
    ))
}

/// GET /api/auth/me
pub async fn handle_me(auth: AuthUser) -> Json<UserResponse> {
    Json(UserResponse { user: auth.user })
}

/// POST /api/auth/password
pub async fn handle_change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<PasswordChangeBody>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(body) = payload?;
    let change = parse_password_change(body).map_err(AppError::Validation)?;

    let changed = state
        .sessions
        .update_password(auth.user.id, &change, Some(&auth.token))
        .await?;
    if !changed {
        return Err(AppError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }
    Ok(Json(SuccessResponse { success: true }))
}
