//! `auth_token` cookie: Set-Cookie values and Cookie header parsing.

use axum::http::{header::COOKIE, HeaderMap};

use crate::auth::token::token_ttl;

pub const AUTH_COOKIE: &str = "auth_token";
/// Older clients stored the token under this name.
pub const LEGACY_AUTH_COOKIE: &str = "auth-token";

/// Set-Cookie value carrying a freshly issued token.
pub fn session_cookie(token: &str, secure: bool) -> String {
    build(token, token_ttl().num_seconds(), secure)
}

/// Set-Cookie value that removes the auth cookie from the browser.
pub fn clear_session_cookie(secure: bool) -> String {
    build("", 0, secure)
}

fn build(value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{AUTH_COOKIE}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Value of the named cookie across all `Cookie` headers. Empty values count
/// as absent.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
