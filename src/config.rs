use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_ID: &str = "frontend_user";
pub const DEFAULT_ORG: &str = "vidina";
pub const DEFAULT_REFRESH_DELAY_MS: u64 = 500;

pub const ENV_BASE_URL: &str = "TICKET_CHAT_BASE_URL";
pub const ENV_USER_ID: &str = "TICKET_CHAT_USER_ID";
pub const ENV_ORG: &str = "TICKET_CHAT_ORG";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub org: Option<String>,
    pub refresh_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`, falling back to defaults if the file does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Environment variables take precedence over the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = non_empty(ENV_BASE_URL) {
            self.base_url = Some(base_url);
        }
        if let Some(user_id) = non_empty(ENV_USER_ID) {
            self.user_id = Some(user_id);
        }
        if let Some(org) = non_empty(ENV_ORG) {
            self.org = Some(org);
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(DEFAULT_USER_ID)
    }

    pub fn org(&self) -> &str {
        self.org.as_deref().unwrap_or(DEFAULT_ORG)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms.unwrap_or(DEFAULT_REFRESH_DELAY_MS))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ticket-chat").join("config.json"))
    }

    pub fn get_log_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("ticket-chat").join("ticket-chat.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.base_url(), "http://localhost:8000");
        assert_eq!(config.user_id(), "frontend_user");
        assert_eq!(config.org(), "vidina");
        assert_eq!(config.refresh_delay(), Duration::from_millis(500));
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://tickets.internal:9000".to_string()),
            org: Some("acme".to_string()),
            refresh_delay_ms: Some(250),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.user_id(), "frontend_user");
        assert_eq!(loaded.refresh_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"request_timeout_secs": 30}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BASE_URL, "http://env:1234"),
            (ENV_ORG, "   "),
        ]);
        let mut config = Config {
            org: Some("from-file".to_string()),
            ..Config::default()
        };

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.base_url(), "http://env:1234");
        assert_eq!(config.org(), "from-file");
        assert_eq!(config.user_id(), DEFAULT_USER_ID);
    }
}
