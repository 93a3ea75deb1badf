use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Persisted UI preferences. A single dark-mode flag today, stored as JSON
/// under a fixed key; a missing or unreadable file falls back to defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UiPrefs {
    #[serde(default, rename = "darkMode")]
    pub dark_mode: bool,
}

#[derive(Debug)]
pub struct PrefsStore {
    path: PathBuf,
    prefs: UiPrefs,
}

impl PrefsStore {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "ignoring corrupt prefs file");
                UiPrefs::default()
            }),
            Err(_) => UiPrefs::default(),
        };
        Self { path, prefs }
    }

    pub fn dark_mode(&self) -> bool {
        self.prefs.dark_mode
    }

    /// Flips the dark-mode flag and persists it. Returns the new value.
    pub fn toggle_dark_mode(&mut self) -> anyhow::Result<bool> {
        self.prefs.dark_mode = !self.prefs.dark_mode;
        let raw = serde_json::to_string_pretty(&self.prefs)?;
        std::fs::write(&self.path, raw)?;
        Ok(self.prefs.dark_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::PrefsStore;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("supportdesk_prefs_{tag}_{}.json", std::process::id()))
    }

    #[test]
    fn missing_file_defaults_to_light_mode() {
        let store = PrefsStore::load(temp_path("missing"));
        assert!(!store.dark_mode());
    }

    #[test]
    fn toggle_round_trips_through_the_file() {
        let path = temp_path("toggle");
        let mut store = PrefsStore::load(&path);
        assert!(store.toggle_dark_mode().expect("toggle should persist"));

        let reloaded = PrefsStore::load(&path);
        assert!(reloaded.dark_mode());

        std::fs::remove_file(&path).expect("temp prefs file should be removable");
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{{not json").expect("temp prefs file should be writable");
        let store = PrefsStore::load(&path);
        assert!(!store.dark_mode());
        std::fs::remove_file(&path).expect("temp prefs file should be removable");
    }
}
