//! Credential store: persisted users and sessions behind a trait seam.
//!
//! `SessionService` holds an `Arc<dyn CredentialStore>`; production wires in
//! `PgCredentialStore`, tests wire in `MemoryCredentialStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::session::SessionRecord;
use crate::models::user::UserRecord;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgCredentialStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint (user email, session token) rejected the write.
    #[error("record already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact, case-sensitive match on the stored email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn insert_user(&self, email: &str, password_hash: &str)
        -> Result<UserRecord, StoreError>;

    /// Returns false when no user with that id exists.
    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    async fn insert_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRecord, StoreError>;

    /// The owner of a session matching `token` whose `expires_at` is after `now`.
    async fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, StoreError>;

    async fn delete_sessions_by_token(&self, token: &str) -> Result<u64, StoreError>;

    /// Deletes every session of `user_id`, except the one holding `keep_token`.
    async fn delete_user_sessions(
        &self,
        user_id: Uuid,
        keep_token: Option<&str>,
    ) -> Result<u64, StoreError>;

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
