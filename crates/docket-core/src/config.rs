//! Configuration management for Docket.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/docket/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser automation settings
    pub browser: BrowserSettings,
    /// Search orchestration settings
    pub search: SearchSettings,
    /// Storage settings
    pub storage: StorageSettings,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `DOCKET_HEADLESS`: Override browser headless mode (true/false)
    /// - `DOCKET_DATABASE_PATH`: Override the database file path
    /// - `DOCKET_CHALLENGE_WAIT_SECS`: Override the captcha wait window
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to an already-loaded config.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DOCKET_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("DOCKET_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(val);
            tracing::debug!(
                "Override storage.database_path from env: {}",
                self.storage.database_path.display()
            );
        }

        if let Ok(val) = std::env::var("DOCKET_CHALLENGE_WAIT_SECS") {
            if let Ok(secs) = val.parse() {
                self.search.challenge_wait_secs = secs;
                tracing::debug!("Override search.challenge_wait_secs from env: {}", secs);
            }
        }
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/docket/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("dev", "docket", "docket").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/docket`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("dev", "docket", "docket").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Page navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Fixed user agent; empty selects a randomized desktop agent
    pub user_agent: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            user_agent: String::new(),
        }
    }
}

/// Search orchestration settings.
///
/// Retry and backoff parameters are deliberately configuration rather
/// than constants; deployments tune them against the court site's
/// observed behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Base URL of the court case-search application
    pub base_url: String,
    /// Maximum challenge submission attempts before giving up
    pub challenge_budget: u32,
    /// How long to wait for an externally supplied captcha code, in seconds
    pub challenge_wait_secs: u64,
    /// Maximum transient-network retries per navigation
    pub retry_budget: u32,
    /// Base delay for exponential backoff, in milliseconds
    pub retry_delay_ms: u64,
    /// Overall wall-clock budget for one search attempt, in seconds
    pub attempt_budget_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://delhihighcourt.nic.in/app/".to_string(),
            challenge_budget: 3,
            challenge_wait_secs: 120,
            retry_budget: 3,
            retry_delay_ms: 2000,
            attempt_budget_secs: 300,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
    /// Maximum connections in the pool
    pub max_connections: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("docket.db"),
            max_connections: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.browser.headless);
        assert_eq!(config.browser.navigation_timeout_secs, 30);
        assert_eq!(config.search.challenge_budget, 3);
        assert_eq!(config.search.retry_budget, 3);
        assert_eq!(config.storage.max_connections, 5);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[storage]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.search.base_url, config.search.base_url);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.browser.headless = false;
        config.search.challenge_wait_secs = 45;

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded_contents = fs::read_to_string(&config_path).expect("read config file");
        let loaded: AppConfig = toml::from_str(&loaded_contents).expect("parse loaded config");

        assert!(!loaded.browser.headless);
        assert_eq!(loaded.search.challenge_wait_secs, 45);
    }

    #[test]
    fn test_partial_config() {
        // Partial TOML configs fill the rest from defaults
        let toml_str = r#"
[search]
challenge_budget = 5

[browser]
headless = false
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.search.challenge_budget, 5);
        assert!(!config.browser.headless);
        // These should be defaults
        assert_eq!(config.search.retry_budget, 3);
        assert_eq!(config.browser.window_width, 1920);
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("DOCKET_CHALLENGE_WAIT_SECS", "15");
        std::env::set_var("DOCKET_HEADLESS", "false");

        let mut config = AppConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.search.challenge_wait_secs, 15);
        assert!(!config.browser.headless);

        std::env::remove_var("DOCKET_CHALLENGE_WAIT_SECS");
        std::env::remove_var("DOCKET_HEADLESS");
    }
}
