//! Application configuration loaded from `config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "SPOTYTUBE_CONFIG";
const APP_DIR: &str = "spotytube";
const DB_FILE: &str = "library.db";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the library database.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Number of history entries kept; `None` or 0 keeps everything.
    pub history_limit: Option<usize>,
    pub progress_interval_ms: u64,
    /// Simulated length of every track in the headless transport.
    pub default_track_seconds: f64,
    /// Where `sync` mirrors the library. Sync is disabled when unset.
    pub sync_export_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(".spotytube")),
            log_dir: PathBuf::from(".logs"),
            history_limit: Some(500),
            progress_interval_ms: 1000,
            default_track_seconds: 180.0,
            sync_export_path: None,
        }
    }
}

impl AppConfig {
    /// Load from `$SPOTYTUBE_CONFIG`, else the user config dir, else defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml")));

        match path {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(50))
    }
}
