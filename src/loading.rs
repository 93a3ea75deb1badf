use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

/// Loading key for the full-screen user-list load.
pub const KEY_USERS: &str = "users";
/// Loading key guarding a full dashboard refresh.
pub const KEY_DASHBOARD: &str = "dashboard";
/// Loading key for the send button.
pub const KEY_SEND: &str = "send";

/// Per-chat loading key.
pub fn message_key(user_id: &str) -> String {
    format!("message:{user_id}")
}

/// Receives loading transitions so the presentation layer can show or revert
/// its indicators (overlay, button spinners, per-chat typing dots).
pub trait LoadingListener: Send + Sync {
    fn loading_changed(&self, key: &str, loading: bool);
    /// Everything was cleared at once; any in-progress visual reverts.
    fn all_cleared(&self);
}

/// No-op listener for headless use.
#[derive(Debug, Default)]
pub struct SilentListener;

impl LoadingListener for SilentListener {
    fn loading_changed(&self, _key: &str, _loading: bool) {}
    fn all_cleared(&self) {}
}

/// Tracks which logical operations are currently in flight. Keys are
/// independent; a key never set reads as not loading.
pub struct LoadingTracker {
    states: RwLock<HashMap<String, bool>>,
    listener: Arc<dyn LoadingListener>,
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new(Arc::new(SilentListener))
    }
}

impl LoadingTracker {
    pub fn new(listener: Arc<dyn LoadingListener>) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            listener,
        }
    }

    pub async fn set_loading(&self, key: &str, loading: bool) {
        debug!(key, loading, "loading state changed");
        if loading {
            self.states.write().await.insert(key.to_owned(), true);
        } else {
            self.states.write().await.remove(key);
        }
        self.listener.loading_changed(key, loading);
    }

    pub async fn is_loading(&self, key: &str) -> bool {
        self.states.read().await.get(key).copied().unwrap_or(false)
    }

    pub async fn clear_all(&self) {
        self.states.write().await.clear();
        self.listener.all_cleared();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::{LoadingListener, LoadingTracker, message_key};

    #[derive(Default)]
    struct CountingListener {
        changes: AtomicUsize,
        clears: AtomicUsize,
    }

    impl LoadingListener for CountingListener {
        fn loading_changed(&self, _key: &str, _loading: bool) {
            self.changes.fetch_add(1, Ordering::SeqCst);
        }

        fn all_cleared(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn unset_keys_read_as_not_loading() {
        let tracker = LoadingTracker::default();
        assert!(!tracker.is_loading("never-set").await);
    }

    #[tokio::test]
    async fn set_and_clear_single_key() {
        let tracker = LoadingTracker::default();
        tracker.set_loading("users", true).await;
        assert!(tracker.is_loading("users").await);
        tracker.set_loading("users", false).await;
        assert!(!tracker.is_loading("users").await);
    }

    #[tokio::test]
    async fn independent_keys_coexist() {
        let tracker = LoadingTracker::default();
        tracker.set_loading(&message_key("u1"), true).await;
        tracker.set_loading(&message_key("u2"), true).await;
        tracker.set_loading(&message_key("u1"), false).await;
        assert!(!tracker.is_loading(&message_key("u1")).await);
        assert!(tracker.is_loading(&message_key("u2")).await);
    }

    #[tokio::test]
    async fn clear_all_resets_every_key_and_notifies() {
        let listener = Arc::new(CountingListener::default());
        let tracker = LoadingTracker::new(listener.clone());
        tracker.set_loading("users", true).await;
        tracker.set_loading("send", true).await;

        tracker.clear_all().await;

        assert!(!tracker.is_loading("users").await);
        assert!(!tracker.is_loading("send").await);
        assert_eq!(listener.clears.load(Ordering::SeqCst), 1);
    }
}
