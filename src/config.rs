//! Configuration management for MeetSpace
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::auth::credentials::CredentialPersistence;
use crate::error::{MeetspaceError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Main configuration structure for MeetSpace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Session and credential storage settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL all endpoints are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("meetspace/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

/// Durable backend used by the dual-durable persistence mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file in the platform data directory
    #[default]
    File,
    /// OS native keyring
    Keyring,
}

impl std::str::FromStr for StorageBackend {
    type Err = MeetspaceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" => Ok(StorageBackend::Keyring),
            other => Err(MeetspaceError::Config(format!(
                "Invalid session storage: {}. Must be one of: file, keyring",
                other
            ))),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the refresh credential lives
    #[serde(default)]
    pub persistence: CredentialPersistence,

    /// Durable backend for `dual_durable`; ignored in cookie mode
    #[serde(default)]
    pub storage: StorageBackend,

    /// Override for the credentials file location
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment variable and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed command-line arguments
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MeetspaceError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| MeetspaceError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("MEETSPACE_API_BASE") {
            tracing::debug!(base_url = %base_url, "Env override: MEETSPACE_API_BASE");
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("MEETSPACE_API_TIMEOUT") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MEETSPACE_API_TIMEOUT: {}", timeout);
            }
        }

        if let Ok(persistence) = std::env::var("MEETSPACE_SESSION_PERSISTENCE") {
            match persistence.parse() {
                Ok(value) => self.session.persistence = value,
                Err(e) => tracing::warn!("{}", e),
            }
        }

        if let Ok(storage) = std::env::var("MEETSPACE_SESSION_STORAGE") {
            match storage.parse() {
                Ok(value) => self.session.storage = value,
                Err(e) => tracing::warn!("{}", e),
            }
        }

        if let Ok(path) = std::env::var("MEETSPACE_CREDENTIALS_PATH") {
            if !path.trim().is_empty() {
                tracing::debug!(path = %path, "Env override: MEETSPACE_CREDENTIALS_PATH");
                self.session.credentials_path = Some(PathBuf::from(path));
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(base_url) = &cli.api_base {
            self.api.base_url = base_url.clone();
        }

        if let Some(persistence) = cli.persistence {
            self.session.persistence = persistence;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not an http(s) URL or the timeout is
    /// outside `1..=600` seconds
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(MeetspaceError::Config("api.base_url cannot be empty".to_string()).into());
        }

        crate::api::endpoint::ApiBase::parse(&self.api.base_url)?;

        if self.api.timeout_seconds == 0 {
            return Err(MeetspaceError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.api.timeout_seconds > 600 {
            return Err(MeetspaceError::Config(
                "api.timeout_seconds must be less than or equal to 600".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(
            config.session.persistence,
            CredentialPersistence::DualDurable
        );
        assert_eq!(config.session.storage, StorageBackend::File);
        assert!(config.session.credentials_path.is_none());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_base_url() {
        let mut config = Config::default();
        config.api.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_non_http_base_url() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com/api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timeout_bounds() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config.api.timeout_seconds = 601;
        assert!(config.validate().is_err());

        config.api.timeout_seconds = 600;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: https://book.example.org/api
  timeout_seconds: 10
session:
  persistence: memory_with_cookie_refresh
  storage: keyring
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://book.example.org/api");
        assert_eq!(config.api.timeout_seconds, 10);
        assert!(config.api.user_agent.starts_with("meetspace/"));
        assert_eq!(
            config.session.persistence,
            CredentialPersistence::MemoryWithCookieRefresh
        );
        assert_eq!(config.session.storage, StorageBackend::Keyring);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_BASE);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = Cli::default();
        let config = Config::load("/nonexistent/meetspace.yaml", &cli).unwrap();
        assert_eq!(config.api.timeout_seconds, 30);
    }

    #[test]
    #[serial]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api:\n  timeout_seconds: 45").unwrap();

        let cli = Cli::default();
        let config = Config::load(file.path().to_str().unwrap(), &cli).unwrap();
        assert_eq!(config.api.timeout_seconds, 45);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api: [unclosed").unwrap();

        let cli = Cli::default();
        assert!(Config::load(file.path().to_str().unwrap(), &cli).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("MEETSPACE_API_BASE", "http://10.0.0.5:8000/api");
        std::env::set_var("MEETSPACE_API_TIMEOUT", "12");
        std::env::set_var("MEETSPACE_SESSION_PERSISTENCE", "cookie");
        std::env::set_var("MEETSPACE_SESSION_STORAGE", "keyring");
        std::env::set_var("MEETSPACE_CREDENTIALS_PATH", "/tmp/meetspace-creds.json");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("MEETSPACE_API_BASE");
        std::env::remove_var("MEETSPACE_API_TIMEOUT");
        std::env::remove_var("MEETSPACE_SESSION_PERSISTENCE");
        std::env::remove_var("MEETSPACE_SESSION_STORAGE");
        std::env::remove_var("MEETSPACE_CREDENTIALS_PATH");

        assert_eq!(config.api.base_url, "http://10.0.0.5:8000/api");
        assert_eq!(config.api.timeout_seconds, 12);
        assert_eq!(
            config.session.persistence,
            CredentialPersistence::MemoryWithCookieRefresh
        );
        assert_eq!(config.session.storage, StorageBackend::Keyring);
        assert_eq!(
            config.session.credentials_path,
            Some(PathBuf::from("/tmp/meetspace-creds.json"))
        );
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        std::env::set_var("MEETSPACE_API_TIMEOUT", "soon");
        std::env::set_var("MEETSPACE_SESSION_PERSISTENCE", "carrier-pigeon");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("MEETSPACE_API_TIMEOUT");
        std::env::remove_var("MEETSPACE_SESSION_PERSISTENCE");

        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(
            config.session.persistence,
            CredentialPersistence::DualDurable
        );
    }

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli {
            api_base: Some("https://override.example/api".to_string()),
            persistence: Some(CredentialPersistence::MemoryWithCookieRefresh),
            ..Cli::default()
        };

        let mut config = Config::default();
        config.apply_cli_overrides(&cli);
        assert_eq!(config.api.base_url, "https://override.example/api");
        assert_eq!(
            config.session.persistence,
            CredentialPersistence::MemoryWithCookieRefresh
        );
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("FILE".parse::<StorageBackend>().unwrap(), StorageBackend::File);
        assert_eq!(
            "keyring".parse::<StorageBackend>().unwrap(),
            StorageBackend::Keyring
        );
        assert!("vault".parse::<StorageBackend>().is_err());
    }
}
