//! Boundary parsing for auth request bodies.
//!
//! Raw bodies arrive with every field optional; these functions turn them
//! into typed values or a human-readable validation message.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::auth::password::MIN_PASSWORD_LENGTH;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Body of `POST /api/auth/register` and `POST /api/auth/login`.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `POST /api/auth/password`.
#[derive(Debug, Default, Deserialize)]
pub struct PasswordChangeBody {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

fn require_pair(body: CredentialsBody) -> Result<Credentials, String> {
    match (present(body.email), present(body.password)) {
        (Some(email), Some(password)) => Ok(Credentials { email, password }),
        _ => Err("Email and password are required".to_string()),
    }
}

/// Registration: both fields present, email well-formed, password long enough.
pub fn parse_registration(body: CredentialsBody) -> Result<Credentials, String> {
    let credentials = require_pair(body)?;
    if !is_valid_email(&credentials.email) {
        return Err("Invalid email format".to_string());
    }
    if credentials.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    Ok(credentials)
}

/// Login: both fields present, nothing more. A malformed email simply fails
/// the lookup and gets the same answer as any other bad credentials.
pub fn parse_login(body: CredentialsBody) -> Result<Credentials, String> {
    require_pair(body)
}

pub fn parse_password_change(body: PasswordChangeBody) -> Result<PasswordChange, String> {
    let (Some(current_password), Some(new_password)) =
        (present(body.current_password), present(body.new_password))
    else {
        return Err("Current and new password are required".to_string());
    };
    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    Ok(PasswordChange {
        current_password,
        new_password,
    })
}
