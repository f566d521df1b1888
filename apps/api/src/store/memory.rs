//! In-memory `CredentialStore` used by unit and router tests.
//!
//! Session lookups can be made to fail, or to stop after reading and wait
//! for the test to let them return.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use crate::models::session::SessionRecord;
use crate::models::user::UserRecord;
use crate::store::{CredentialStore, StoreError};

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<Vec<UserRecord>>,
    sessions: RwLock<Vec<SessionRecord>>,
    session_lookups_fail: AtomicBool,
    lookup_pause: Mutex<Option<Arc<LookupPause>>>,
}

/// Handshake for a paused `find_session_user`: `reached` fires once the row
/// has been read, and the call returns after `resume`.
#[derive(Default)]
pub struct LookupPause {
    pub reached: Notify,
    pub resume: Notify,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn sessions_for(&self, user_id: Uuid) -> Vec<SessionRecord> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Every later `find_session_user` fails as if the database were down.
    pub fn fail_session_lookups(&self) {
        self.session_lookups_fail.store(true, Ordering::SeqCst);
    }

    /// The next `find_session_user` reads its answer, then waits on the
    /// returned handle before returning it.
    pub fn pause_next_session_lookup(&self) -> Arc<LookupPause> {
        let pause = Arc::new(LookupPause::default());
        *self.lookup_pause.lock().unwrap() = Some(pause.clone());
        pause
    }

    /// Moves the row expiry of every session holding `token`.
    pub async fn set_session_expiry(&self, token: &str, expires_at: DateTime<Utc>) {
        for session in self.sessions.write().await.iter_mut() {
            if session.token == token {
                session.expires_at = expires_at;
            }
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.push(record.clone());
        Ok(record)
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRecord, StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.iter().any(|s| s.token == token) {
            return Err(StoreError::Duplicate);
        }
        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        sessions.push(record.clone());
        Ok(record)
    }

    async fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, StoreError> {
        if self.session_lookups_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let owner = self
            .sessions
            .read()
            .await
            .iter()
            .find(|s| s.token == token && s.is_live_at(now))
            .map(|s| s.user_id);
        let found = match owner {
            Some(user_id) => self.find_user_by_id(user_id).await,
            None => Ok(None),
        };

        let pause = self.lookup_pause.lock().unwrap().take();
        if let Some(pause) = pause {
            pause.reached.notify_one();
            pause.resume.notified().await;
        }
        found
    }

    async fn delete_sessions_by_token(&self, token: &str) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|s| s.token != token);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_user_sessions(
        &self,
        user_id: Uuid,
        keep_token: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|s| s.user_id != user_id || Some(s.token.as_str()) == keep_token);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|s| s.is_live_at(now));
        Ok((before - sessions.len()) as u64)
    }
}
