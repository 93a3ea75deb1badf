use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    error::ApiError,
    types::{
        Activity, DashboardSummary, Envelope, LogEntry, MessageRecord, MessagesResponse,
        QueueStats, ReplyRequest, SystemHealth, UserRecord, UsersResponse,
    },
};

/// Seam for backoff delays so tests can observe requested sleeps instead of
/// waiting them out.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Exponential backoff for the user-list load: 1s, 2s, 4s, 8s, capped at 10s.
/// `attempt` is the 1-based count of failures so far.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(4);
    Duration::from_millis((1000u64 << exp).min(10_000))
}

/// Typed client for the support backend: admin endpoints plus the enhanced
/// dashboard API. Normalizes every failure into [`ApiError`].
pub struct ApiClient {
    http: Client,
    base_url: String,
    sleeper: Arc<dyn Sleeper>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_sleeper(base_url, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(base_url: impl Into<String>, sleeper: Arc<dyn Sleeper>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: Client::new(),
            base_url,
            sleeper,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::decode(response, path).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::decode(response, path).await
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from)?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_detail(&body, status.as_u16()),
            });
        }
        serde_json::from_str(&body).map_err(|error| ApiError::Parse(format!("{context}: {error}")))
    }

    pub async fn fetch_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        let response: UsersResponse = self.get_json("/admin/users").await?;
        debug!(count = response.users.len(), "fetched user list");
        Ok(response.users)
    }

    /// User-list load with bounded retry. Attempt counter starts at zero; each
    /// failure increments it, and unless the ceiling is reached the client
    /// sleeps the backoff delay and tries again. Reaching the ceiling surfaces
    /// the last error with no further attempt.
    pub async fn fetch_users_with_retry(
        &self,
        max_attempts: u32,
    ) -> Result<Vec<UserRecord>, ApiError> {
        let mut attempt = 0;
        loop {
            match self.fetch_users().await {
                Ok(users) => return Ok(users),
                Err(error) => {
                    attempt += 1;
                    warn!(attempt, %error, "user list load failed");
                    if attempt >= max_attempts {
                        return Err(error);
                    }
                    self.sleeper.sleep(backoff_delay(attempt)).await;
                }
            }
        }
    }

    pub async fn fetch_messages(&self, user_id: &str) -> Result<Vec<MessageRecord>, ApiError> {
        let path = format!("/admin/messages/{user_id}");
        let response: MessagesResponse = self.get_json(&path).await?;
        if let Some(error) = response.error {
            // Application-level rejection delivered in a 2xx body.
            return Err(ApiError::Status {
                status: 200,
                message: error,
            });
        }
        response
            .messages
            .ok_or_else(|| ApiError::Parse(format!("{path}: neither messages nor error present")))
    }

    pub async fn send_reply(&self, user_id: &str, message: &str) -> Result<(), ApiError> {
        let body = ReplyRequest {
            user_id: user_id.to_owned(),
            message: message.to_owned(),
        };
        let _: serde_json::Value = self.post_json("/admin/reply", &body).await?;
        Ok(())
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError> {
        let envelope: Envelope<DashboardSummary> =
            self.get_json("/api/enhanced/dashboard/summary").await?;
        envelope.into_data("dashboard summary")
    }

    pub async fn recent_activity(&self, limit: usize) -> Result<Vec<Activity>, ApiError> {
        let path = format!("/api/enhanced/friends/recent?limit={limit}");
        let envelope: Envelope<Vec<Activity>> = self.get_json(&path).await?;
        envelope.into_data("recent activity")
    }

    pub async fn system_health(&self) -> Result<SystemHealth, ApiError> {
        let envelope: Envelope<SystemHealth> = self.get_json("/api/enhanced/system/health").await?;
        envelope.into_data("system health")
    }

    /// A `success=false` envelope here is a legitimate test outcome, so the
    /// raw envelope is returned for the caller to report.
    pub async fn telegram_test(&self) -> Result<Envelope<serde_json::Value>, ApiError> {
        self.post_json("/api/enhanced/telegram/test", &serde_json::json!({}))
            .await
    }

    pub async fn system_logs(&self, limit: usize) -> Result<Vec<LogEntry>, ApiError> {
        let path = format!("/api/enhanced/system/logs?limit={limit}");
        let envelope: Envelope<Vec<LogEntry>> = self.get_json(&path).await?;
        envelope.into_data("system logs")
    }

    pub async fn process_notification_queue(&self) -> Result<QueueStats, ApiError> {
        let envelope: Envelope<QueueStats> = self
            .post_json("/api/enhanced/telegram/process-queue", &serde_json::json!({}))
            .await?;
        envelope.into_data("process queue")
    }

    pub async fn export_chat_history(&self) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(self.url("/api/enhanced/chat/export"))
            .send()
            .await
            .map_err(ApiError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: "export failed".to_owned(),
            });
        }
        Ok(response.bytes().await.map_err(ApiError::from)?.to_vec())
    }
}

/// Pulls a FastAPI-style `{"detail": ...}` message out of an error body when
/// one is present.
fn error_detail(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(|detail| detail.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("status {status}")
            } else {
                trimmed.to_owned()
            }
        })
}
