//! Short-lived cache of recently verified tokens.
//!
//! Saves the session-row lookup for tokens seen within the last `ttl`.
//! Entries never outlive the token's own expiry and are dropped explicitly on
//! logout, so revocation through this process stays immediate.
//!
//! Every invalidation bumps a revocation epoch. A verification reads the epoch
//! before its store lookup and hands it back to `insert`, which refuses to
//! cache anything if a revocation happened in between.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::user::User;

/// Above this many entries, inserts first purge expired ones.
const PURGE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct CachedSession {
    user: User,
    valid_until: DateTime<Utc>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedSession>,
    epoch: u64,
}

pub struct VerifiedTokenCache {
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl VerifiedTokenCache {
    /// A zero `ttl` disables the cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(Duration::zero())
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl > Duration::zero()
    }

    pub async fn get(&self, token: &str, now: DateTime<Utc>) -> Option<User> {
        if !self.is_enabled() {
            return None;
        }
        self.state
            .read()
            .await
            .entries
            .get(token)
            .filter(|entry| entry.valid_until > now)
            .map(|entry| entry.user.clone())
    }

    /// Revocation epoch to pass to `insert`. Read it before the store lookup.
    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    /// No-op when any invalidation ran after `seen_epoch` was read.
    pub async fn insert(
        &self,
        token: &str,
        user: User,
        token_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
        seen_epoch: u64,
    ) {
        if !self.is_enabled() {
            return;
        }
        let valid_until = match now.checked_add_signed(self.ttl) {
            Some(until) => until.min(token_expires_at),
            None => token_expires_at,
        };
        if valid_until <= now {
            return;
        }
        let mut state = self.state.write().await;
        if state.epoch != seen_epoch {
            return;
        }
        if state.entries.len() >= PURGE_THRESHOLD {
            state.entries.retain(|_, entry| entry.valid_until > now);
        }
        state
            .entries
            .insert(token.to_string(), CachedSession { user, valid_until });
    }

    pub async fn invalidate(&self, token: &str) {
        if self.is_enabled() {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.entries.remove(token);
        }
    }

    /// Drops every cached token of `user_id` except `keep_token`.
    pub async fn invalidate_user(&self, user_id: Uuid, keep_token: Option<&str>) {
        if self.is_enabled() {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.entries.retain(|token, entry| {
                entry.user.id != user_id || Some(token.as_str()) == keep_token
            });
        }
    }
}
