use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::{
    api::ApiClient,
    error::ApiError,
    loading::{KEY_DASHBOARD, LoadingTracker},
    notify::{DEFAULT_DURATION, Notifier, Severity},
    types::{Activity, DashboardSummary, SystemHealth},
    view::DashboardView,
};

/// Whether the dashboard surface is currently visible to the user. Background
/// polling is skipped while it is not.
pub trait VisibilityProbe: Send + Sync {
    fn is_visible(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct AlwaysVisible;

impl VisibilityProbe for AlwaysVisible {
    fn is_visible(&self) -> bool {
        true
    }
}

/// Periodic dashboard refresher: summary, recent activity and system health,
/// each load isolated from the others' failures. Last-good data is kept in
/// memory so a failed poll degrades to a toast, never a blank surface.
pub struct Dashboard {
    api: Arc<ApiClient>,
    loading: Arc<LoadingTracker>,
    notifier: Arc<Notifier>,
    view: Arc<dyn DashboardView>,
    visibility: Arc<dyn VisibilityProbe>,
    refresh_interval: Duration,
    activity_limit: usize,
    export_dir: PathBuf,
    summary: RwLock<Option<DashboardSummary>>,
    activities: RwLock<Vec<Activity>>,
    health: RwLock<Option<SystemHealth>>,
}

impl Dashboard {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<ApiClient>,
        loading: Arc<LoadingTracker>,
        notifier: Arc<Notifier>,
        view: Arc<dyn DashboardView>,
        visibility: Arc<dyn VisibilityProbe>,
        refresh_interval: Duration,
        activity_limit: usize,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            api,
            loading,
            notifier,
            view,
            visibility,
            refresh_interval,
            activity_limit,
            export_dir,
            summary: RwLock::new(None),
            activities: RwLock::new(Vec::new()),
            health: RwLock::new(None),
        }
    }

    /// Initial sequential load of all three panels.
    pub async fn init(&self) {
        self.load_summary().await;
        self.load_activities().await;
        self.load_health().await;
    }

    /// Runs the polling loop forever. Each period, a full refresh is issued
    /// only while the surface is visible and no refresh is already in flight.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.refresh_interval);
        interval.tick().await; // the first tick fires immediately
        loop {
            interval.tick().await;
            if !self.visibility.is_visible() {
                continue;
            }
            self.refresh_all().await;
        }
    }

    /// Full refresh guarded by the coarse dashboard loading flag. This is not
    /// a mutex; it only suppresses a new full refresh while one is running.
    pub async fn refresh_all(&self) {
        if self.loading.is_loading(KEY_DASHBOARD).await {
            return;
        }
        self.load_summary().await;
        self.load_activities().await;
        self.load_health().await;
    }

    async fn load_summary(&self) {
        self.loading.set_loading(KEY_DASHBOARD, true).await;
        match self.api.dashboard_summary().await {
            Ok(summary) => {
                self.view.render_summary(&summary);
                *self.summary.write().await = Some(summary);
            }
            Err(err) => self.handle_error(&err, "loading dashboard summary"),
        }
        self.loading.set_loading(KEY_DASHBOARD, false).await;
    }

    async fn load_activities(&self) {
        match self.api.recent_activity(self.activity_limit).await {
            Ok(activities) => {
                self.view.render_activities(&activities);
                *self.activities.write().await = activities;
            }
            Err(err) => self.handle_error(&err, "loading recent activity"),
        }
    }

    async fn load_health(&self) {
        match self.api.system_health().await {
            Ok(health) => {
                self.view.render_health(&health);
                *self.health.write().await = Some(health);
            }
            Err(err) => self.handle_error(&err, "loading system health"),
        }
    }

    pub async fn last_summary(&self) -> Option<DashboardSummary> {
        self.summary.read().await.clone()
    }

    pub async fn last_activities(&self) -> Vec<Activity> {
        self.activities.read().await.clone()
    }

    pub async fn last_health(&self) -> Option<SystemHealth> {
        self.health.read().await.clone()
    }

    pub async fn show_system_logs(&self, limit: usize) {
        match self.api.system_logs(limit).await {
            Ok(logs) => self.view.render_logs(&logs),
            Err(err) => self.handle_error(&err, "loading system logs"),
        }
    }

    pub async fn test_telegram(&self) {
        self.notifier.notify(
            "Testing",
            "testing Telegram connection",
            Severity::Info,
            DEFAULT_DURATION,
        );
        match self.api.telegram_test().await {
            Ok(envelope) if envelope.success => {
                self.notifier.notify(
                    "Success",
                    "Telegram connection works",
                    Severity::Success,
                    DEFAULT_DURATION,
                );
            }
            Ok(envelope) => {
                let detail = envelope
                    .data
                    .as_ref()
                    .and_then(|data| data.get("error"))
                    .and_then(|err| err.as_str())
                    .unwrap_or("unknown error");
                self.notifier
                    .notify_error("Telegram test failed", detail.to_owned());
            }
            Err(err) => self.handle_error(&err, "telegram test"),
        }
    }

    pub async fn process_notification_queue(&self) {
        self.notifier.notify(
            "Processing",
            "processing notification queue",
            Severity::Info,
            DEFAULT_DURATION,
        );
        match self.api.process_notification_queue().await {
            Ok(stats) => {
                self.notifier.notify(
                    "Complete",
                    format!("processed: {} sent, {} failed", stats.sent, stats.failed),
                    Severity::Success,
                    DEFAULT_DURATION,
                );
            }
            Err(err) => self.handle_error(&err, "queue processing"),
        }
    }

    /// Downloads the chat history export and writes it to the export
    /// directory as `chat_history_<ISO-date>.csv`.
    pub async fn export_data(&self) -> anyhow::Result<PathBuf> {
        self.notifier.notify(
            "Exporting",
            "preparing data export",
            Severity::Info,
            DEFAULT_DURATION,
        );
        let bytes = match self.api.export_chat_history().await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.handle_error(&err, "data export");
                return Err(err.into());
            }
        };

        let name = format!("chat_history_{}.csv", Utc::now().format("%Y-%m-%d"));
        let path = self.export_dir.join(name);
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), size = bytes.len(), "chat history exported");
        self.notifier.notify(
            "Success",
            "data exported",
            Severity::Success,
            DEFAULT_DURATION,
        );
        Ok(path)
    }

    fn handle_error(&self, err: &ApiError, context: &str) {
        error!(context, %err, "dashboard operation failed");
        self.notifier
            .notify_error("Error", format!("{context}: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::SocketAddr,
        path::PathBuf,
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
    use serde_json::json;

    use super::{AlwaysVisible, Dashboard, VisibilityProbe};
    use crate::{
        api::ApiClient,
        loading::{KEY_DASHBOARD, LoadingTracker},
        notify::Notifier,
        types::{Activity, DashboardSummary, LogEntry, SystemHealth},
        view::DashboardView,
    };

    #[derive(Debug, Default)]
    struct NullView;

    impl DashboardView for NullView {
        fn render_summary(&self, _summary: &DashboardSummary) {}
        fn render_activities(&self, _activities: &[Activity]) {}
        fn render_health(&self, _health: &SystemHealth) {}
        fn render_logs(&self, _logs: &[LogEntry]) {}
    }

    struct Toggle(AtomicBool);

    impl VisibilityProbe for Toggle {
        fn is_visible(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Clone, Default)]
    struct BackendState {
        summary_hits: Arc<AtomicUsize>,
        health_ok: bool,
    }

    async fn summary_handler(State(state): State<BackendState>) -> Json<serde_json::Value> {
        state.summary_hits.fetch_add(1, Ordering::SeqCst);
        Json(json!({
            "success": true,
            "data": {
                "chat": {"total_messages_7d": 42, "active_users_7d": 7},
                "friends": {"net_growth_7d": 3, "new_followers_7d": 5},
                "telegram": {"total_notifications_7d": 12, "notifications_sent_7d": 11},
                "system": {"total_logs_24h": 100}
            }
        }))
    }

    async fn recent_handler() -> Json<serde_json::Value> {
        Json(json!({
            "success": true,
            "data": [
                {"activity_type": "follow", "user_id": "u9", "timestamp": "2025-06-01T10:00:00Z"}
            ]
        }))
    }

    async fn health_handler(
        State(state): State<BackendState>,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        if !state.health_ok {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Ok(Json(json!({
            "success": true,
            "data": {
                "status": "healthy",
                "cpu_usage": 12.5,
                "memory_usage": 40.0,
                "database_status": "connected"
            }
        })))
    }

    async fn export_handler() -> &'static str {
        "user_id,message\nu1,hello\n"
    }

    async fn serve_backend(state: BackendState) -> SocketAddr {
        let router = Router::new()
            .route("/api/enhanced/dashboard/summary", get(summary_handler))
            .route("/api/enhanced/friends/recent", get(recent_handler))
            .route("/api/enhanced/system/health", get(health_handler))
            .route("/api/enhanced/chat/export", get(export_handler))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral port should bind");
        let addr = listener.local_addr().expect("listener should have an addr");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("test server should run");
        });
        addr
    }

    fn dashboard_for(
        addr: SocketAddr,
        visibility: Arc<dyn VisibilityProbe>,
        loading: Arc<LoadingTracker>,
        refresh_interval: Duration,
        export_dir: PathBuf,
    ) -> Dashboard {
        Dashboard::new(
            Arc::new(ApiClient::new(format!("http://{addr}"))),
            loading,
            Arc::new(Notifier::default()),
            Arc::new(NullView),
            visibility,
            refresh_interval,
            10,
            export_dir,
        )
    }

    #[tokio::test]
    async fn init_tolerates_a_failing_health_endpoint() {
        let state = BackendState {
            health_ok: false,
            ..BackendState::default()
        };
        let addr = serve_backend(state).await;
        let dashboard = dashboard_for(
            addr,
            Arc::new(AlwaysVisible),
            Arc::new(LoadingTracker::default()),
            Duration::from_secs(30),
            PathBuf::from("."),
        );

        dashboard.init().await;

        let summary = dashboard
            .last_summary()
            .await
            .expect("summary load should survive health failure");
        assert_eq!(summary.chat.total_messages_7d, 42);
        assert_eq!(dashboard.last_activities().await.len(), 1);
        assert!(dashboard.last_health().await.is_none());
    }

    #[tokio::test]
    async fn refresh_is_skipped_while_hidden() {
        let state = BackendState {
            health_ok: true,
            ..BackendState::default()
        };
        let hits = state.summary_hits.clone();
        let addr = serve_backend(state).await;
        let visible = Arc::new(Toggle(AtomicBool::new(false)));
        let dashboard = Arc::new(dashboard_for(
            addr,
            visible.clone(),
            Arc::new(LoadingTracker::default()),
            Duration::from_millis(50),
            PathBuf::from("."),
        ));

        let runner = dashboard.clone();
        tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        visible.0.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(hits.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn coarse_loading_flag_suppresses_overlapping_refresh() {
        let state = BackendState {
            health_ok: true,
            ..BackendState::default()
        };
        let hits = state.summary_hits.clone();
        let addr = serve_backend(state).await;
        let loading = Arc::new(LoadingTracker::default());
        let dashboard = dashboard_for(
            addr,
            Arc::new(AlwaysVisible),
            loading.clone(),
            Duration::from_secs(30),
            PathBuf::from("."),
        );

        loading.set_loading(KEY_DASHBOARD, true).await;
        dashboard.refresh_all().await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        loading.set_loading(KEY_DASHBOARD, false).await;
        dashboard.refresh_all().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn export_writes_a_dated_csv() {
        let addr = serve_backend(BackendState::default()).await;
        let export_dir = std::env::temp_dir().join(format!(
            "supportdesk_export_test_{}",
            std::process::id()
        ));
        tokio::fs::create_dir_all(&export_dir)
            .await
            .expect("temp export dir should be creatable");
        let dashboard = dashboard_for(
            addr,
            Arc::new(AlwaysVisible),
            Arc::new(LoadingTracker::default()),
            Duration::from_secs(30),
            export_dir.clone(),
        );

        let path = dashboard.export_data().await.expect("export should succeed");
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("export file should have a name");
        assert!(name.starts_with("chat_history_"));
        assert!(name.ends_with(".csv"));
        let contents = tokio::fs::read_to_string(&path)
            .await
            .expect("export file should be readable");
        assert!(contents.contains("hello"));

        tokio::fs::remove_dir_all(&export_dir)
            .await
            .expect("temp export dir should be removable");
    }
}
