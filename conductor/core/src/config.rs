//! Conductor Configuration
//!
//! Layered configuration for the streaming session engine.
//!
//! # Sources
//!
//! Lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. TOML file (`$XDG_CONFIG_HOME/zelf/config.toml`, or an explicit path)
//! 3. Environment variables
//! 4. Caller overrides (CLI flags)
//!
//! # Environment Variables
//!
//! - `ZELF_API_URL`: Backend base URL (default: `http://localhost:8000`)
//! - `ZELF_STREAM_PATH`: Streaming chat endpoint (default: `/chat/stream`)
//! - `ZELF_CONNECT_TIMEOUT_MS`: TCP connect timeout
//! - `ZELF_REQUEST_TIMEOUT_MS`: Overall request timeout (0 = none)
//! - `ZELF_ERROR_MESSAGE`: Text shown when a turn fails

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default user-visible failure text
pub const DEFAULT_ERROR_MESSAGE: &str =
    "Sorry, something went wrong while contacting the agent. Please try again.";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    /// Backend base URL, without trailing slash
    pub base_url: String,
    /// Path of the streaming chat endpoint
    pub stream_path: String,
    /// Path of the health endpoint
    pub health_path: String,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Overall request timeout in milliseconds (0 = no timeout)
    ///
    /// Streams stay open for the whole turn, so this is off by default.
    pub request_timeout_ms: u64,
    /// Content that replaces the assistant message when a turn fails
    pub error_message: String,
    /// Capacity of the update notification channel
    pub update_capacity: usize,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: "/chat/stream".to_string(),
            health_path: "/health".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 0,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            update_capacity: 256,
        }
    }
}

impl ConductorConfig {
    /// Create configuration from defaults plus environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay environment variables onto this configuration
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("ZELF_API_URL") {
            self.base_url = url;
        }
        if let Ok(path) = std::env::var("ZELF_STREAM_PATH") {
            self.stream_path = path;
        }
        if let Some(ms) = env_u64("ZELF_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = ms;
        }
        if let Some(ms) = env_u64("ZELF_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = ms;
        }
        if let Ok(message) = std::env::var("ZELF_ERROR_MESSAGE") {
            self.error_message = message;
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the failure text
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Full URL of the streaming endpoint
    #[must_use]
    pub fn stream_url(&self) -> String {
        join_url(&self.base_url, &self.stream_path)
    }

    /// Full URL of the health endpoint
    #[must_use]
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }

    /// Connect timeout as a `Duration`
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Overall request timeout, if any
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("base_url is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https:// (got {url})"
            )));
        }
        for (name, path) in [
            ("stream_path", &self.stream_path),
            ("health_path", &self.health_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "{name} must start with '/' (got {path})"
                )));
            }
        }
        if self.update_capacity == 0 {
            return Err(ConfigError::Invalid(
                "update_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file location (`$XDG_CONFIG_HOME/zelf/config.toml`)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("zelf").join("config.toml"))
}

/// Load configuration from a specific TOML file (no environment overlay)
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_config_from_path(path: &Path) -> Result<ConductorConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ConductorConfig = toml::from_str(&raw)?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Load configuration from file (explicit or default) and environment
///
/// A missing default file is fine; a missing explicit file is an error.
///
/// # Errors
///
/// Fails on unreadable or malformed files and on validation errors.
pub fn load_config(explicit: Option<&Path>) -> Result<ConductorConfig, ConfigError> {
    let mut config = match explicit {
        Some(path) => load_config_from_path(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => load_config_from_path(&path)?,
            _ => ConductorConfig::default(),
        },
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_urls() {
        let config = ConductorConfig::default();
        assert_eq!(config.stream_url(), "http://localhost:8000/chat/stream");
        assert_eq!(config.health_url(), "http://localhost:8000/health");
        assert!(config.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = ConductorConfig::default().with_base_url("https://agent.example/");
        assert_eq!(config.stream_url(), "https://agent.example/chat/stream");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ConductorConfig::default().with_base_url("");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ConductorConfig::default().with_base_url("ftp://agent");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ConductorConfig {
            stream_path: "chat/stream".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"http://10.0.0.2:9000\"").unwrap();
        writeln!(file, "request_timeout_ms = 30000").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.stream_path, "/chat/stream");
        assert_eq!(config.error_message, DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = [not toml").unwrap();
        assert!(matches!(
            load_config_from_path(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = load_config(Some(Path::new("/nonexistent/zelf/config.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
