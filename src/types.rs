use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Standard `{success, data}` wrapper used by the enhanced API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwraps the payload, treating an unsuccessful or data-less envelope
    /// as a structurally invalid response rather than defaulting.
    pub fn into_data(self, context: &str) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Parse(format!(
                "{context}: server reported success=false"
            )));
        }
        self.data
            .ok_or_else(|| ApiError::Parse(format!("{context}: envelope is missing data")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_in_live_chat: bool,
    #[serde(default)]
    pub latest_message: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    User,
    Admin,
    Bot,
    System,
}

impl SenderType {
    pub fn label(self) -> &'static str {
        match self {
            SenderType::User => "customer",
            SenderType::Admin => "admin",
            SenderType::Bot => "bot",
            SenderType::System => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender_type: SenderType,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserRecord>,
}

/// `/admin/messages/:user_id` answers with either a transcript or an
/// application-level error string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Option<Vec<MessageRecord>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStats {
    pub total_messages_7d: i64,
    pub active_users_7d: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendStats {
    pub net_growth_7d: i64,
    pub new_followers_7d: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramStats {
    pub total_notifications_7d: i64,
    pub notifications_sent_7d: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_logs_24h: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub chat: ChatStats,
    pub friends: FriendStats,
    pub telegram: TelegramStats,
    pub system: SystemStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub activity_type: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub database_status: String,
}

impl SystemHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub log_level: String,
    pub category: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    #[serde(default)]
    pub sent: i64,
    #[serde(default)]
    pub failed: i64,
}

#[cfg(test)]
mod tests {
    use super::{Envelope, SenderType, SystemHealth, UserRecord};
    use crate::error::ApiError;

    #[test]
    fn envelope_rejects_unsuccessful_response() {
        let envelope: Envelope<SystemHealth> =
            serde_json::from_str(r#"{"success": false, "data": null}"#)
                .expect("envelope should deserialize");
        let err = envelope.into_data("system health").unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[test]
    fn envelope_rejects_missing_data() {
        let envelope: Envelope<SystemHealth> =
            serde_json::from_str(r#"{"success": true}"#).expect("envelope should deserialize");
        assert!(envelope.into_data("system health").is_err());
    }

    #[test]
    fn user_record_defaults_optional_fields() {
        let user: UserRecord = serde_json::from_str(r#"{"user_id": "u1", "display_name": "Ada"}"#)
            .expect("user should deserialize");
        assert!(user.picture_url.is_none());
        assert!(!user.is_in_live_chat);
        assert_eq!(user.unread_count, 0);
    }

    #[test]
    fn sender_type_uses_snake_case_wire_form() {
        let sender: SenderType = serde_json::from_str(r#""admin""#).expect("should deserialize");
        assert_eq!(sender, SenderType::Admin);
        assert_eq!(sender.label(), "admin");
    }
}
