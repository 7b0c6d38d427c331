//! Pending OAuth authorizations, keyed by the `state` parameter.

use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Seconds a pending authorization stays valid.
pub const AUTH_STATE_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct PendingAuth {
    pub state: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl PendingAuth {
    pub fn generate() -> Self {
        let state: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        Self {
            state,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        now - self.created_at >= AUTH_STATE_TTL_SECS
    }
}

/// In-memory only: a restart invalidates logins in flight.
pub struct AuthStateStore {
    states: RwLock<HashMap<String, PendingAuth>>,
}

impl AuthStateStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    pub async fn store(&self, pending: PendingAuth) {
        let mut states = self.states.write().await;
        states.insert(pending.state.clone(), pending);
    }

    /// Removes the state and returns it if it was known and still fresh.
    pub async fn take(&self, state: &str) -> Option<PendingAuth> {
        let mut states = self.states.write().await;
        states
            .remove(state)
            .filter(|pending| !pending.is_expired(chrono::Utc::now().timestamp()))
    }

    pub async fn cleanup_expired(&self) {
        let now = chrono::Utc::now().timestamp();
        let mut states = self.states.write().await;
        states.retain(|_, pending| !pending.is_expired(now));
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}

impl Default for AuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_can_be_taken_once() {
        let store = AuthStateStore::new();
        let pending = PendingAuth::generate();
        let key = pending.state.clone();
        assert_eq!(key.len(), 32);

        store.store(pending).await;
        assert!(store.take(&key).await.is_some());
        assert!(store.take(&key).await.is_none());
    }

    #[tokio::test]
    async fn unknown_state_is_rejected() {
        let store = AuthStateStore::new();
        assert!(store.take("nope").await.is_none());
    }

    #[tokio::test]
    async fn expired_states_are_rejected_and_cleaned() {
        let store = AuthStateStore::new();
        let stale = PendingAuth {
            state: "stale".to_string(),
            created_at: chrono::Utc::now().timestamp() - AUTH_STATE_TTL_SECS - 1,
        };
        store.store(stale.clone()).await;
        store.store(PendingAuth::generate()).await;

        store.cleanup_expired().await;
        assert_eq!(store.len().await, 1);

        store.store(stale).await;
        assert!(store.take("stale").await.is_none());
    }
}
