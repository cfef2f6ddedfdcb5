use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.json";

const DEFAULT_HOMESERVER_URL: &str = "https://joeldc.duckdns.org";
const DEFAULT_SERVER_NAME: &str = "joeldc.duckdns.org";
const DEFAULT_AI_BASE_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub homeserver_url: String,
    /// Domain used to expand bare usernames into `@user:server_name`.
    pub server_name: String,
    pub ai_base_url: String,
    pub initial_sync_limit: u32,
    pub sync_timeout_ms: u64,
    pub sync_retry_secs: u64,
    pub backfill_limit: u32,
    pub ai_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            homeserver_url: DEFAULT_HOMESERVER_URL.to_string(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
            ai_base_url: DEFAULT_AI_BASE_URL.to_string(),
            initial_sync_limit: 30,
            sync_timeout_ms: 30_000,
            sync_retry_secs: 5,
            backfill_limit: 30,
            ai_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Apply `MATRIX_HOMESERVER_URL`, `MATRIX_SERVER_NAME` and `AI_API_BASE`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty("MATRIX_HOMESERVER_URL") {
            self.homeserver_url = url;
        }
        if let Some(name) = non_empty("MATRIX_SERVER_NAME") {
            self.server_name = name;
        }
        if let Some(base) = non_empty("AI_API_BASE") {
            self.ai_base_url = base;
        }
        self
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn sync_retry_delay(&self) -> Duration {
        Duration::from_secs(self.sync_retry_secs)
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config("does/not/exist.json");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server_name, "joeldc.duckdns.org");
        assert_eq!(config.initial_sync_limit, 30);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let path = std::env::temp_dir().join(format!(
            "matrix_ai_dashboard_config_{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{ "server_name": "example.org", "sync_retry_secs": 1 }"#).unwrap();

        let config = load_config(path.to_str().unwrap());
        fs::remove_file(&path).ok();

        assert_eq!(config.server_name, "example.org");
        assert_eq!(config.sync_retry_delay(), Duration::from_secs(1));
        assert_eq!(config.homeserver_url, DEFAULT_HOMESERVER_URL);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!(
            "matrix_ai_dashboard_bad_config_{}.json",
            std::process::id()
        ));
        fs::write(&path, "not json").unwrap();

        let config = load_config(path.to_str().unwrap());
        fs::remove_file(&path).ok();

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn overrides_replace_only_non_empty_values() {
        let config = AppConfig::default().with_overrides(|key| match key {
            "MATRIX_HOMESERVER_URL" => Some("https://matrix.example.org".to_string()),
            "MATRIX_SERVER_NAME" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.homeserver_url, "https://matrix.example.org");
        assert_eq!(config.server_name, DEFAULT_SERVER_NAME);
        assert_eq!(config.ai_base_url, DEFAULT_AI_BASE_URL);
    }
}
