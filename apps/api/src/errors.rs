use axum::{
    extract::rejection::JsonRejection,
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::cookies::clear_session_cookie;
use crate::auth::AuthError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A presented session token was refused. Rendered as 401 with a
    /// Set-Cookie that clears the stored token.
    #[error("Invalid or expired session")]
    SessionRejected { secure_cookie: bool },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// No credentials were sent at all.
    pub fn unauthenticated() -> Self {
        AppError::Unauthorized("Authentication required".to_string())
    }

    pub fn session_rejected(secure_cookie: bool) -> Self {
        AppError::SessionRejected { secure_cookie }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Conflict => AppError::Conflict(err.to_string()),
            AuthError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            // Extractors answer rejected sessions themselves, with the cookie
            // flags from config.
            AuthError::Unauthenticated => AppError::Unauthorized(err.to_string()),
            AuthError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::SessionRejected { .. } => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        if let AppError::SessionRejected { secure_cookie } = self {
            let cleared = clear_session_cookie(secure_cookie);
            return (status, [(SET_COOKIE, cleared)], body).into_response();
        }

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::unauthenticated(), StatusCode::UNAUTHORIZED),
            (AppError::session_rejected(false), StatusCode::UNAUTHORIZED),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    fn cleared_cookie(err: AppError) -> String {
        err.into_response()
            .headers()
            .get(SET_COOKIE)
            .expect("rejected session must clear the auth cookie")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_rejected_session_clears_cookie() {
        let cookie = cleared_cookie(AppError::session_rejected(false));
        assert!(cookie.starts_with("auth_token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_rejected_session_clear_keeps_secure_flag() {
        let cookie = cleared_cookie(AppError::session_rejected(true));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_other_errors_leave_cookie_alone() {
        for err in [
            AppError::Conflict("taken".into()),
            AppError::unauthenticated(),
            AppError::from(AuthError::InvalidCredentials),
        ] {
            assert!(err.into_response().headers().get(SET_COOKIE).is_none());
        }
    }

    #[test]
    fn test_auth_errors_map_to_http_kinds() {
        assert!(matches!(
            AppError::from(AuthError::Conflict),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(AuthError::InvalidCredentials),
            AppError::Unauthorized(msg) if msg == "Invalid email or password"
        ));
        assert!(matches!(
            AppError::from(AuthError::Unauthenticated),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            AppError::from(AuthError::Internal("db down".into())),
            AppError::Internal(_)
        ));
    }
}
