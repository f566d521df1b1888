//! Periodic removal of expired session rows.
//!
//! Logout is the only other path that deletes sessions, so without this task
//! expired rows would accumulate forever.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::store::{CredentialStore, StoreError};

/// Deletes every session whose expiry has passed. Returns the number removed.
pub async fn sweep_expired_sessions(store: &dyn CredentialStore) -> Result<u64, StoreError> {
    let removed = store.delete_expired_sessions(Utc::now()).await?;
    if removed > 0 {
        info!(removed, "swept expired sessions");
    } else {
        debug!("session sweep found nothing to remove");
    }
    Ok(removed)
}

/// Runs `sweep_expired_sessions` every `interval` until the handle is aborted.
/// Failures are logged and retried on the next tick.
pub fn spawn_session_sweeper(
    store: Arc<dyn CredentialStore>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired_sessions(store.as_ref()).await {
                error!("session sweep failed: {e}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCredentialStore;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_sweep_removes_only_expired_rows() {
        let store = MemoryCredentialStore::new();
        let user = store.insert_user("a@b.com", "hash").await.unwrap();
        let now = Utc::now();
        store
            .insert_session(user.id, "expired", now - ChronoDuration::minutes(1))
            .await
            .unwrap();
        store
            .insert_session(user.id, "live", now + ChronoDuration::days(1))
            .await
            .unwrap();

        let removed = sweep_expired_sessions(&store).await.unwrap();

        assert_eq!(removed, 1);
        let remaining = store.sessions_for(user.id).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token, "live");
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store() {
        let store = MemoryCredentialStore::new();
        assert_eq!(sweep_expired_sessions(&store).await.unwrap(), 0);
        assert!(store.sessions_for(Uuid::new_v4()).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_runs_on_interval() {
        let store = Arc::new(MemoryCredentialStore::new());
        let user = store.insert_user("a@b.com", "hash").await.unwrap();
        store
            .insert_session(user.id, "expired", Utc::now() - ChronoDuration::minutes(1))
            .await
            .unwrap();

        let handle = spawn_session_sweeper(store.clone(), Duration::from_secs(60));
        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.session_count().await, 0);

        store
            .insert_session(user.id, "expired-later", Utc::now() - ChronoDuration::minutes(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(store.session_count().await, 0);

        handle.abort();
    }
}
