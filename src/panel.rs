use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::{
    api::ApiClient,
    error::ApiError,
    loading::{KEY_SEND, KEY_USERS, LoadingTracker, message_key},
    notify::{DEFAULT_DURATION, Notifier, Severity},
    types::{MessageRecord, SenderType, UserRecord},
    view::PanelView,
};

/// Orchestrates the chat panel: user list, selected conversation, transcript
/// loading and the reply flow. All collaborators are injected; nothing here
/// is a process-wide singleton.
pub struct AdminPanel {
    api: Arc<ApiClient>,
    loading: Arc<LoadingTracker>,
    notifier: Arc<Notifier>,
    view: Arc<dyn PanelView>,
    users: RwLock<HashMap<String, UserRecord>>,
    user_order: RwLock<Vec<String>>,
    selected: RwLock<Option<String>>,
    // Bumped on every selection; transcript responses from an older
    // generation are discarded instead of overwriting the newer chat.
    generation: AtomicU64,
    max_retries: u32,
}

impl AdminPanel {
    pub fn new(
        api: Arc<ApiClient>,
        loading: Arc<LoadingTracker>,
        notifier: Arc<Notifier>,
        view: Arc<dyn PanelView>,
        max_retries: u32,
    ) -> Self {
        Self {
            api,
            loading,
            notifier,
            view,
            users: RwLock::new(HashMap::new()),
            user_order: RwLock::new(Vec::new()),
            selected: RwLock::new(None),
            generation: AtomicU64::new(0),
            max_retries,
        }
    }

    /// Loads the user list with the bounded retry policy behind the
    /// full-screen loading key. Returns whether the load succeeded.
    pub async fn load_users(&self) -> bool {
        self.loading.set_loading(KEY_USERS, true).await;
        let result = self.api.fetch_users_with_retry(self.max_retries).await;
        self.loading.set_loading(KEY_USERS, false).await;

        match result {
            Ok(users) => {
                self.replace_users(users).await;
                true
            }
            Err(err) => {
                error!(%err, "user list load failed permanently");
                self.notifier.notify_error(
                    "Could not load users",
                    "check the connection and try again",
                );
                false
            }
        }
    }

    /// Background refresh: no loading UI, failures only logged.
    pub async fn refresh_users_quietly(&self) {
        match self.api.fetch_users().await {
            Ok(users) => self.replace_users(users).await,
            Err(err) => warn!(%err, "quiet user refresh failed"),
        }
    }

    /// Replaces the user map wholesale; it reflects only the most recent
    /// successful fetch, never a union of historical ones.
    async fn replace_users(&self, users: Vec<UserRecord>) {
        {
            let mut map = self.users.write().await;
            let mut order = self.user_order.write().await;
            map.clear();
            order.clear();
            for user in &users {
                order.push(user.user_id.clone());
                map.insert(user.user_id.clone(), user.clone());
            }
        }
        let selected = self.selected.read().await.clone();
        self.view.render_users(&users, selected.as_deref());
    }

    pub async fn selected_user(&self) -> Option<String> {
        self.selected.read().await.clone()
    }

    async fn users_snapshot(&self) -> Vec<UserRecord> {
        let map = self.users.read().await;
        self.user_order
            .read()
            .await
            .iter()
            .filter_map(|id| map.get(id).cloned())
            .collect()
    }

    /// Makes `user_id` the active conversation: exclusive active-row marking,
    /// chat header update, and a transcript load for the new selection. A
    /// prior selection is simply replaced.
    pub async fn select_user(&self, user_id: &str) {
        *self.selected.write().await = Some(user_id.to_owned());
        self.generation.fetch_add(1, Ordering::SeqCst);

        let users = self.users_snapshot().await;
        self.view.render_users(&users, Some(user_id));
        if let Some(user) = self.users.read().await.get(user_id).cloned() {
            self.view.set_chat_header(&user);
        }

        self.load_user_messages(user_id).await;
    }

    pub async fn load_user_messages(&self, user_id: &str) {
        let generation = self.generation.load(Ordering::SeqCst);
        let key = message_key(user_id);
        self.loading.set_loading(&key, true).await;
        let result = self.api.fetch_messages(user_id).await;
        self.loading.set_loading(&key, false).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(user_id, "discarding transcript for a superseded selection");
            return;
        }

        match result {
            Ok(messages) => {
                self.notifier.notify(
                    "Messages",
                    format!("loaded {} messages", messages.len()),
                    Severity::Success,
                    DEFAULT_DURATION,
                );
                self.view.render_messages(&messages);
            }
            Err(err) => {
                error!(user_id, %err, "transcript load failed");
                self.notifier
                    .notify_error("Could not load messages", err.to_string());
            }
        }
    }

    /// Sends an admin reply to `user_id`, or to the current selection when no
    /// explicit target is given. Empty text and a missing target are rejected
    /// before any network call. On success the message is appended to the
    /// transcript ahead of any persistence confirmation; a failed send leaves
    /// the transcript untouched.
    pub async fn send_message(
        &self,
        message: &str,
        user_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let text = message.trim();
        if text.is_empty() {
            return Err(ApiError::Validation("message must not be empty".into()));
        }
        let target = match user_id {
            Some(id) => id.to_owned(),
            None => self
                .selected
                .read()
                .await
                .clone()
                .ok_or_else(|| ApiError::Validation("no target user selected".into()))?,
        };

        let chat_key = message_key(&target);
        self.loading.set_loading(KEY_SEND, true).await;
        self.loading.set_loading(&chat_key, true).await;

        let result = self.api.send_reply(&target, text).await;

        self.loading.set_loading(KEY_SEND, false).await;
        self.loading.set_loading(&chat_key, false).await;

        match result {
            Ok(()) => {
                self.view.append_message(&MessageRecord {
                    sender_type: SenderType::Admin,
                    message: text.to_owned(),
                    created_at: Utc::now(),
                });
                self.view.clear_input();
                self.notifier.notify(
                    "Sent",
                    "message delivered",
                    Severity::Success,
                    DEFAULT_DURATION,
                );
                Ok(())
            }
            Err(err) => {
                error!(target, %err, "send failed");
                self.notifier
                    .notify_error("Could not send message", err.to_string());
                Err(err)
            }
        }
    }

    /// Reloads the transcript for the current selection; no-op otherwise.
    pub async fn refresh_chat(&self) {
        if let Some(user_id) = self.selected.read().await.clone() {
            self.load_user_messages(&user_id).await;
        }
    }
}
