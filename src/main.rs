use std::{sync::Arc, time::Duration};

use supportdesk::{
    api::ApiClient,
    config::AppConfig,
    dashboard::{AlwaysVisible, Dashboard},
    error::ApiError,
    loading::{KEY_USERS, LoadingTracker},
    notify::{DEFAULT_DURATION, Notifier, Severity},
    panel::AdminPanel,
    prefs::PrefsStore,
    view::ConsoleView,
    webhook,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    info!(api = %config.api_base_url, "supportdesk admin console starting");

    let view = Arc::new(ConsoleView);
    let api = Arc::new(ApiClient::new(config.api_base_url.clone()));
    let loading = Arc::new(LoadingTracker::new(view.clone()));
    let notifier = Arc::new(Notifier::new(view.clone()));

    let panel = Arc::new(AdminPanel::new(
        api.clone(),
        loading.clone(),
        notifier.clone(),
        view.clone(),
        config.max_fetch_retries,
    ));
    let dashboard = Arc::new(Dashboard::new(
        api,
        loading.clone(),
        notifier.clone(),
        view.clone(),
        Arc::new(AlwaysVisible),
        Duration::from_secs(config.refresh_interval_secs),
        config.activity_limit,
        config.export_dir.clone(),
    ));

    let mut prefs = PrefsStore::load(&config.prefs_path);
    if prefs.dark_mode() {
        info!("dark mode enabled");
    }

    let webhook_bind = config.webhook_bind;
    tokio::spawn(async move {
        if let Err(error) = webhook::serve(webhook_bind).await {
            warn!(?error, "webhook responder stopped with error");
        }
    });

    dashboard.init().await;
    panel.load_users().await;

    let dashboard_runner = dashboard.clone();
    tokio::spawn(async move { dashboard_runner.run().await });

    // Background user-list refresh, skipped while a foreground load holds
    // the key.
    let quiet_panel = panel.clone();
    let quiet_loading = loading.clone();
    let user_refresh = Duration::from_secs(config.refresh_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(user_refresh);
        interval.tick().await;
        loop {
            interval.tick().await;
            if !quiet_loading.is_loading(KEY_USERS).await {
                quiet_panel.refresh_users_quietly().await;
            }
        }
    });

    command_loop(panel, dashboard, notifier, loading, &mut prefs).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();
}

async fn command_loop(
    panel: Arc<AdminPanel>,
    dashboard: Arc<Dashboard>,
    notifier: Arc<Notifier>,
    loading: Arc<LoadingTracker>,
    prefs: &mut PrefsStore,
) -> anyhow::Result<()> {
    println!(
        "commands: users | select <id> | send <text> | refresh | dashboard | logs | export | \
         telegram-test | process-queue | dark | quit"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "" => {}
            "users" => {
                panel.load_users().await;
            }
            "select" => {
                if rest.is_empty() {
                    println!("usage: select <user id>");
                } else {
                    panel.select_user(rest.trim()).await;
                }
            }
            "send" => match panel.send_message(rest, None).await {
                Ok(()) => {}
                Err(ApiError::Validation(reason)) => println!("not sent: {reason}"),
                Err(_) => {} // already surfaced as a toast
            },
            "refresh" => panel.refresh_chat().await,
            "dashboard" => dashboard.refresh_all().await,
            "export" => {
                if let Ok(path) = dashboard.export_data().await {
                    println!("wrote {}", path.display());
                }
            }
            "logs" => dashboard.show_system_logs(20).await,
            "telegram-test" => dashboard.test_telegram().await,
            "process-queue" => dashboard.process_notification_queue().await,
            "dark" => match prefs.toggle_dark_mode() {
                Ok(enabled) => {
                    let mode = if enabled { "dark" } else { "light" };
                    notifier.notify(
                        "Theme",
                        format!("switched to {mode} mode"),
                        Severity::Info,
                        DEFAULT_DURATION,
                    );
                }
                Err(error) => warn!(?error, "could not persist theme preference"),
            },
            "quit" | "exit" => {
                loading.clear_all().await;
                break;
            }
            other => println!("unknown command: {other}"),
        }
    }

    Ok(())
}
