use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::auth::token::token_ttl;
use crate::auth::PasswordChangePolicy;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    /// `APP_ENV=production`; adds `Secure` to the auth cookie.
    pub production: bool,
    /// Built frontend pages, served for every non-API path.
    pub frontend_dir: String,
    /// "Current user" endpoint probed by the page gatekeeper.
    pub auth_me_url: String,
    /// 0 disables the verified-token cache. Never above the token lifetime.
    pub session_cache_ttl_secs: u64,
    /// 0 disables the expired-session sweeper.
    pub session_sweep_interval_secs: u64,
    pub password_change_policy: PasswordChangePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port: u16 = env_or("PORT", 8080)?;
        let jwt_secret = require_env("JWT_SECRET")?;
        if jwt_secret.is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let revoke_on_change: bool = env_or("REVOKE_SESSIONS_ON_PASSWORD_CHANGE", false)?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret,
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            production: std::env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            frontend_dir: std::env::var("FRONTEND_DIR").unwrap_or_else(|_| "public".to_string()),
            auth_me_url: std::env::var("AUTH_ME_URL")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{port}/api/auth/me")),
            session_cache_ttl_secs: check_cache_ttl(env_or("SESSION_CACHE_TTL_SECS", 0)?)?,
            session_sweep_interval_secs: env_or("SESSION_SWEEP_INTERVAL_SECS", 3600)?,
            password_change_policy: if revoke_on_change {
                PasswordChangePolicy::RevokeOtherSessions
            } else {
                PasswordChangePolicy::KeepSessions
            },
        })
    }

    /// Whether the auth cookie carries the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.production
    }
}

fn check_cache_ttl(secs: u64) -> Result<u64> {
    let max = token_ttl().num_seconds().unsigned_abs();
    if secs > max {
        bail!("SESSION_CACHE_TTL_SECS must not exceed the token lifetime ({max}s), got {secs}");
    }
    Ok(secs)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/unused".to_string(),
            jwt_secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            production: false,
            frontend_dir: "public".to_string(),
            auth_me_url: "http://127.0.0.1:0/api/auth/me".to_string(),
            session_cache_ttl_secs: 0,
            session_sweep_interval_secs: 0,
            password_change_policy: PasswordChangePolicy::KeepSessions,
        }
    }
}
