//! Configuration management for Gramcast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub instagram: InstagramConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    /// Instagram app (client) id
    pub app_id: String,
    /// Instagram app secret
    pub app_secret: String,
    /// Redirect URI registered with the app; the OAuth callback must match it
    pub redirect_uri: String,
    /// Graph API version segment, e.g. "v23.0"
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Base URL for Graph API calls; overridable for tests
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    /// Base URL for the form-encoded OAuth token endpoint
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Base URL for the user-facing authorization page
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Delay between container status polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Base number of status polls before giving up; reels get three times this
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
        }
    }
}

fn default_api_version() -> String {
    "v23.0".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.instagram.com".to_string()
}

fn default_api_base_url() -> String {
    "https://api.instagram.com".to_string()
}

fn default_auth_base_url() -> String {
    "https://www.instagram.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_poll_max_attempts() -> u32 {
    30
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field the services depend on is usable
    pub fn validate(&self) -> Result<()> {
        if self.instagram.app_id.is_empty() {
            return Err(ConfigError::MissingField("instagram.app_id".to_string()).into());
        }
        if self.instagram.app_secret.is_empty() {
            return Err(ConfigError::MissingField("instagram.app_secret".to_string()).into());
        }
        if self.instagram.redirect_uri.is_empty() {
            return Err(ConfigError::MissingField("instagram.redirect_uri".to_string()).into());
        }
        if self.database.path.is_empty() {
            return Err(ConfigError::MissingField("database.path".to_string()).into());
        }
        if self.publish.poll_interval_ms == 0 {
            return Err(ConfigError::MissingField("publish.poll_interval_ms".to_string()).into());
        }
        if self.publish.poll_max_attempts == 0 {
            return Err(ConfigError::MissingField("publish.poll_max_attempts".to_string()).into());
        }
        Ok(())
    }

    /// Create a default configuration with placeholder app credentials
    pub fn default_config() -> Self {
        Self {
            instagram: InstagramConfig {
                app_id: String::new(),
                app_secret: String::new(),
                redirect_uri: "https://localhost:8443/auth/callback".to_string(),
                api_version: default_api_version(),
                graph_base_url: default_graph_base_url(),
                api_base_url: default_api_base_url(),
                auth_base_url: default_auth_base_url(),
            },
            database: DatabaseConfig {
                path: "~/.local/share/gramcast/gramcast.db".to_string(),
            },
            publish: PublishConfig::default(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("GRAMCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("gramcast").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("gramcast"))
}
