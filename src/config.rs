use std::{env, net::SocketAddr, path::PathBuf};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub webhook_bind: SocketAddr,
    pub refresh_interval_secs: u64,
    pub max_fetch_retries: u32,
    pub activity_limit: usize,
    pub export_dir: PathBuf,
    pub prefs_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let webhook_bind = env::var("WEBHOOK_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8081".to_owned())
            .parse()?;

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_owned()),
            webhook_bind,
            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(30),
            max_fetch_retries: env::var("MAX_FETCH_RETRIES")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(5),
            activity_limit: env::var("ACTIVITY_LIMIT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(10),
            export_dir: env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            prefs_path: env::var("PREFS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("supportdesk_prefs.json")),
        })
    }
}
