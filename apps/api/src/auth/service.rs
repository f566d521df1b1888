//! Session service: registration, login, logout, session verification and
//! password change on top of an injected `CredentialStore`.
//!
//! Token lifecycle: Issued → Active → { Expired | Revoked } → Rejected.
//! A token is accepted only when its signature verifies, its embedded expiry
//! has not passed, and a live session row still holds it. There is no refresh.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::cache::VerifiedTokenCache;
use crate::auth::password::{PasswordError, PasswordHasher};
use crate::auth::token::{IssuedToken, TokenSigner};
use crate::auth::validation::{Credentials, PasswordChange};
use crate::models::user::User;
use crate::store::{CredentialStore, StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User with this email already exists")]
    Conflict,

    /// Same error for unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired session")]
    Unauthenticated,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AuthError::Conflict,
            StoreError::Database(e) => AuthError::Internal(format!("database: {e}")),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(format!("password hashing: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::Internal(format!("token signing: {err}"))
    }
}

/// What happens to a user's other sessions when they change their password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordChangePolicy {
    #[default]
    KeepSessions,
    /// Delete every session of the user except the one making the change.
    RevokeOtherSessions,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: IssuedToken,
}

pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    signer: TokenSigner,
    cache: VerifiedTokenCache,
    password_policy: PasswordChangePolicy,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        signer: TokenSigner,
        cache: VerifiedTokenCache,
        password_policy: PasswordChangePolicy,
    ) -> Self {
        Self {
            store,
            hasher,
            signer,
            cache,
            password_policy,
        }
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<User, AuthError> {
        if self
            .store
            .find_user_by_email(&credentials.email)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict);
        }

        let hash = self.hasher.hash(&credentials.password).await?;
        // A concurrent registration that passed the check above still hits
        // the unique index and comes back as Conflict.
        let record = self.store.insert_user(&credentials.email, &hash).await?;

        info!(user_id = %record.id, "registered new user");
        Ok(record.into())
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        let Some(record) = self.store.find_user_by_email(&credentials.email).await? else {
            info!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let matches = match self
            .hasher
            .verify(&credentials.password, &record.password_hash)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                error!(user_id = %record.id, "stored password hash unusable: {e}");
                false
            }
        };
        if !matches {
            info!(user_id = %record.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.signer.issue(record.id, &record.email)?;
        self.store
            .insert_session(record.id, &token.token, token.expires_at)
            .await?;

        info!(user_id = %record.id, expires_at = %token.expires_at, "session created");
        Ok(LoginOutcome {
            user: record.into(),
            token,
        })
    }

    /// Signature and embedded expiry first; only then the session row.
    /// Returns the user as currently stored, not as embedded in the token.
    pub async fn verify_session(&self, token: &str) -> Result<User, AuthError> {
        let claims = self
            .signer
            .verify(token)
            .map_err(|_| AuthError::Unauthenticated)?;

        let now = Utc::now();
        if let Some(user) = self.cache.get(token, now).await {
            return Ok(user);
        }

        let epoch = self.cache.epoch().await;
        let record = self
            .store
            .find_session_user(token, now)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let user = User::from(record);
        self.cache
            .insert(token, user.clone(), claims.expires_at(), now, epoch)
            .await;
        Ok(user)
    }

    /// Idempotent: removing zero rows is still a success.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        // Row first, then the cache: a verification that saw the row read an
        // epoch older than this invalidation and will not re-cache the token.
        let removed = self.store.delete_sessions_by_token(token).await?;
        self.cache.invalidate(token).await;
        info!(removed, "logout");
        Ok(true)
    }

    /// `Ok(false)` when the user is unknown or `current_password` does not
    /// verify. `current_token` is the caller's own session, kept alive under
    /// `RevokeOtherSessions`.
    pub async fn update_password(
        &self,
        user_id: Uuid,
        change: &PasswordChange,
        current_token: Option<&str>,
    ) -> Result<bool, AuthError> {
        let Some(record) = self.store.find_user_by_id(user_id).await? else {
            return Ok(false);
        };

        match self
            .hasher
            .verify(&change.current_password, &record.password_hash)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!(user_id = %user_id, "password change rejected: current password mismatch");
                return Ok(false);
            }
            Err(e) => {
                warn!(user_id = %user_id, "password change rejected: {e}");
                return Ok(false);
            }
        }

        let hash = self.hasher.hash(&change.new_password).await?;
        if !self.store.update_password_hash(user_id, &hash).await? {
            return Ok(false);
        }

        if self.password_policy == PasswordChangePolicy::RevokeOtherSessions {
            let revoked = self
                .store
                .delete_user_sessions(user_id, current_token)
                .await?;
            self.cache.invalidate_user(user_id, current_token).await;
            info!(user_id = %user_id, revoked, "password changed, other sessions revoked");
        } else {
            info!(user_id = %user_id, "password changed");
        }
        Ok(true)
    }
}
