use chrono::{DateTime, Utc};

use crate::{
    loading::LoadingListener,
    notify::{Notification, NotificationSink, Phase},
    types::{Activity, DashboardSummary, LogEntry, MessageRecord, SystemHealth, UserRecord},
};

/// Rendering seam for the chat panel. A graphical surface would paint rows
/// and transcripts; the console surface prints them.
pub trait PanelView: Send + Sync {
    /// Full user list render; the selected row is marked exclusively.
    fn render_users(&self, users: &[UserRecord], selected: Option<&str>);
    fn render_messages(&self, messages: &[MessageRecord]);
    fn append_message(&self, message: &MessageRecord);
    fn set_chat_header(&self, user: &UserRecord);
    fn clear_input(&self);
}

/// Rendering seam for the dashboard surface.
pub trait DashboardView: Send + Sync {
    fn render_summary(&self, summary: &DashboardSummary);
    fn render_activities(&self, activities: &[Activity]);
    fn render_health(&self, health: &SystemHealth);
    fn render_logs(&self, logs: &[LogEntry]);
}

/// Terminal renderer used by the binary. Stateless; everything goes straight
/// to stdout.
#[derive(Debug, Default)]
pub struct ConsoleView;

impl PanelView for ConsoleView {
    fn render_users(&self, users: &[UserRecord], selected: Option<&str>) {
        if users.is_empty() {
            println!("  (no users yet)");
            return;
        }
        for user in users {
            let marker = if selected == Some(user.user_id.as_str()) {
                ">"
            } else {
                " "
            };
            let status = if user.is_in_live_chat { "live" } else { "idle" };
            let unread = if user.unread_count > 0 {
                format!(" [{} unread]", user.unread_count)
            } else {
                String::new()
            };
            let last = user
                .last_activity
                .map(format_relative_time)
                .unwrap_or_else(|| "no activity".to_owned());
            println!(
                "{marker} {} ({}) {status}, {last}{unread}",
                user.display_name, user.user_id
            );
        }
    }

    fn render_messages(&self, messages: &[MessageRecord]) {
        if messages.is_empty() {
            println!("  (no conversation yet)");
            return;
        }
        for message in messages {
            println!(
                "  [{}] {}: {}",
                message.created_at.format("%m-%d %H:%M"),
                message.sender_type.label(),
                message.message
            );
        }
    }

    fn append_message(&self, message: &MessageRecord) {
        println!(
            "  [{}] {}: {}",
            message.created_at.format("%m-%d %H:%M"),
            message.sender_type.label(),
            message.message
        );
    }

    fn set_chat_header(&self, user: &UserRecord) {
        let status = if user.is_in_live_chat {
            "in live chat"
        } else {
            "offline"
        };
        println!("--- {} ({status}) ---", user.display_name);
    }

    fn clear_input(&self) {}
}

impl DashboardView for ConsoleView {
    fn render_summary(&self, summary: &DashboardSummary) {
        println!(
            "messages(7d)={} active_users(7d)={} follower_growth(7d)={} notifications(7d)={}",
            summary.chat.total_messages_7d,
            summary.chat.active_users_7d,
            summary.friends.net_growth_7d,
            summary.telegram.total_notifications_7d,
        );
    }

    fn render_activities(&self, activities: &[Activity]) {
        if activities.is_empty() {
            println!("  (no recent activity)");
            return;
        }
        for activity in activities {
            println!(
                "  {} - {} ({})",
                activity.activity_type,
                activity.user_id,
                format_relative_time(activity.timestamp)
            );
        }
    }

    fn render_health(&self, health: &SystemHealth) {
        println!(
            "system {} cpu={:.0}% mem={:.0}% db={}",
            health.status, health.cpu_usage, health.memory_usage, health.database_status
        );
    }

    fn render_logs(&self, logs: &[LogEntry]) {
        for log in logs {
            println!(
                "  [{}] {} {}: {}",
                log.log_level.to_uppercase(),
                log.timestamp.format("%m-%d %H:%M:%S"),
                log.category,
                log.message
            );
        }
    }
}

impl LoadingListener for ConsoleView {
    fn loading_changed(&self, key: &str, loading: bool) {
        if loading {
            println!("... {key}");
        }
    }

    fn all_cleared(&self) {}
}

impl NotificationSink for ConsoleView {
    fn phase_changed(&self, notification: &Notification, phase: Phase) {
        if phase == Phase::Shown {
            println!(
                "[{}] {}: {}",
                notification.severity.label(),
                notification.title,
                notification.message
            );
        }
    }

    fn removed(&self, _notification: &Notification) {}
}

pub fn format_relative_time(timestamp: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(timestamp);
    if elapsed.num_days() > 0 {
        format!("{}d ago", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m ago", elapsed.num_minutes())
    } else {
        "just now".to_owned()
    }
}
