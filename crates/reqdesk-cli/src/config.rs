//! Configuration file support

use reqdesk_api::client::API_TOKEN_ENV;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for reqdesk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workbench API base URL
    pub base_url: Option<String>,
    /// Project opened when `--project` is not given
    pub project_id: Option<String>,
    /// Bearer token (alternative to REQDESK_API_TOKEN)
    pub api_token: Option<String>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Per-request HTTP timeout
    pub request_timeout_secs: Option<u64>,
    /// Color theme: dark or light
    pub theme: Option<String>,
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reqdesk")
    }

    /// Config file path; REQDESK_CONFIG_PATH wins over the default location
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("REQDESK_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, falling back to defaults with a warning on any failure
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            project_id: None,
            api_token: None,
            tui: Some(true),
            request_timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            theme: Some("dark".to_string()),
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Token from the config file, then from the environment
    pub fn api_token(&self) -> Option<String> {
        self.api_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(API_TOKEN_ENV).ok())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1))
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# reqdesk configuration file
# Place at ~/.config/reqdesk/config.toml (Linux/Mac) or %APPDATA%\reqdesk\config.toml (Windows)

# Workbench API base URL
base_url = "http://localhost:8000"

# Project to open when --project is not given
# project_id = "..."

# Bearer token (optional - REQDESK_API_TOKEN is preferred)
# api_token = "..."

# Whether to use TUI mode by default (true by default)
# Set to false for simple stdin/stdout mode
tui = true

# Per-request timeout in seconds
request_timeout_secs = 60

# Color theme (dark, light)
theme = "dark"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("reqdesk-config-{}-{}", std::process::id(), name))
            .join("config.toml")
    }

    #[test]
    fn test_round_trip() {
        let path = temp_path("round-trip");
        let config = Config {
            base_url: Some("https://workbench.example.com".to_string()),
            project_id: Some("proj-7".to_string()),
            api_token: None,
            tui: Some(false),
            request_timeout_secs: Some(15),
            theme: Some("light".to_string()),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_or_broken_file_falls_back() {
        let path = temp_path("broken");
        assert_eq!(Config::load_from(&path), Config::default());

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "base_url = [not toml").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.tui, Some(true));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_defaults() {
        let config = Config {
            request_timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }
}
