//! Store configuration.
//!
//! Loaded from a TOML file with per-field defaults; connection credentials
//! can also come from the environment (`RECALL_DB_URL`, `RECALL_AUTH_TOKEN`,
//! `RECALL_SYNC_URL`), which wins over the file.

use recall_types::Mode;
use serde::Deserialize;
use std::path::PathBuf;

use crate::{Result, StoreError};

/// Default cache freshness window: one hour.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Database URL. `libsql://` / `http(s)://` for remote, otherwise a local
    /// file path.
    #[serde(default)]
    pub url: String,
    /// Auth token; required for remote URLs.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Remote URL to sync a local replica against. When set, `url` is the
    /// replica's local path.
    #[serde(default)]
    pub sync_url: Option<String>,
    /// Background sync period for replica mode, in seconds.
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
    /// Initial operating mode.
    #[serde(default)]
    pub mode: Mode,
    /// Cache freshness window in seconds; entries older than this miss.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Directory holding the persisted machine-id file. Defaults to the
    /// platform-local data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Requests debug-level logging; honored by the CLI's logging preset.
    #[serde(default)]
    pub debug: bool,
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_db_path() -> String {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recall")
        .join("history.db")
        .to_string_lossy()
        .into_owned()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_db_path(),
            auth_token: None,
            sync_url: None,
            sync_interval_secs: None,
            mode: Mode::Global,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            data_dir: None,
            debug: false,
        }
    }
}

impl StoreConfig {
    /// Load config from a specific TOML file.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: StoreConfig =
            toml::from_str(&content).map_err(|e| StoreError::Config(e.to_string()))?;
        if config.url.is_empty() {
            config.url = default_db_path();
        }
        config.apply_env();
        Ok(config)
    }

    /// Load from `config/recall.toml` when present, else defaults. The
    /// environment always wins for credentials.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/recall.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }
        let mut config = StoreConfig::default();
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("RECALL_DB_URL") {
            self.url = url;
        }
        if let Ok(token) = std::env::var("RECALL_AUTH_TOKEN") {
            self.auth_token = Some(token);
        }
        if let Ok(sync) = std::env::var("RECALL_SYNC_URL") {
            self.sync_url = Some(sync);
        }
    }

    /// True when the URL (or sync URL) names a remote server.
    pub fn is_remote(&self) -> bool {
        is_remote_url(&self.url)
    }

    /// Validate that required connection credentials are present.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(StoreError::Config("database URL is required".into()));
        }
        let needs_token = self.is_remote()
            || self.sync_url.as_deref().map(is_remote_url).unwrap_or(false);
        if needs_token && self.auth_token.as_deref().unwrap_or("").is_empty() {
            return Err(StoreError::Config(
                "auth token is required for remote database URLs".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn is_remote_url(url: &str) -> bool {
    url.starts_with("libsql://") || url.starts_with("http://") || url.starts_with("https://")
}
