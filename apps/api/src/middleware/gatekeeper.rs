//! Edge gatekeeper. Keeps unauthenticated browser navigations away from
//! protected pages.
//!
//! For a protected path: no `auth_token` cookie → redirect to `/`; otherwise
//! ask the "current user" endpoint (forwarding the cookie) and redirect unless
//! it answers with success. Probe failures count as "not authenticated" and
//! are never shown to the user. Everything else passes through untouched.

use axum::async_trait;
use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, info, warn};

use crate::auth::cookies::{read_cookie, AUTH_COOKIE};
use crate::state::AppState;

/// Page prefixes that require a live session. Sub-paths are included.
pub const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/resume/create",
    "/resume/tailor",
    "/editor",
    "/profile",
];

/// Where rejected navigations land.
pub const LOGIN_REDIRECT: &str = "/";

/// `/dashboard` and `/dashboard/x` match `/dashboard`; `/dashboards` does not.
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

#[async_trait]
pub trait IdentityProbe: Send + Sync {
    /// Whether `auth_token` belongs to a live session.
    async fn is_authenticated(&self, auth_token: &str) -> Result<bool, reqwest::Error>;
}

/// Server-to-server call to the "current user" endpoint. Reuses the session
/// service as the single source of truth; the gatekeeper holds no secret.
#[derive(Clone)]
pub struct HttpIdentityProbe {
    client: reqwest::Client,
    me_url: String,
}

impl HttpIdentityProbe {
    pub fn new(me_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            me_url: me_url.into(),
        }
    }
}

#[async_trait]
impl IdentityProbe for HttpIdentityProbe {
    async fn is_authenticated(&self, auth_token: &str) -> Result<bool, reqwest::Error> {
        let response = self
            .client
            .get(&self.me_url)
            .header(COOKIE.as_str(), format!("{AUTH_COOKIE}={auth_token}"))
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

pub async fn gatekeeper(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !is_protected(request.uri().path()) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_owned();
    let Some(token) = read_cookie(request.headers(), AUTH_COOKIE).map(str::to_owned) else {
        info!(path = %path, "no session cookie, redirecting");
        return Redirect::temporary(LOGIN_REDIRECT).into_response();
    };

    match state.identity_probe.is_authenticated(&token).await {
        Ok(true) => {
            debug!(path = %path, "session accepted");
            next.run(request).await
        }
        Ok(false) => {
            info!(path = %path, "session rejected, redirecting");
            Redirect::temporary(LOGIN_REDIRECT).into_response()
        }
        Err(e) => {
            warn!(path = %path, "identity probe failed, redirecting: {e}");
            Redirect::temporary(LOGIN_REDIRECT).into_response()
        }
    }
}
