//! TOML-based configuration for the session client.
//!
//! Reads and writes `AppConfig` at the platform-appropriate location:
//! - Windows:  `%APPDATA%\DisplayOrganizer\config.toml`
//! - Linux:    `~/.config/display-organizer/config.toml`
//! - macOS:    `~/Library/Application Support/DisplayOrganizer/config.toml`
//!
//! Every field carries a serde default so the client works on first run
//! (before a config file exists) and after upgrading from an older file that
//! is missing newer fields.  The bearer credential lives here; it is loaded
//! once at startup and treated as read-only for the life of the process.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Bridge API endpoint and credential settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the bridge, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Static bearer credential sent on every request.
    #[serde(default)]
    pub auth_token: String,
    /// Per-request timeout in seconds; expiry is a transport failure.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Session pacing and pairing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Interval between connection-state polls while connected.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Interval between capture submissions while calibrating.
    #[serde(default = "default_capture_interval_ms")]
    pub capture_interval_ms: u64,
    /// Literal prefix expected in front of the UUID in scanned QR payloads.
    #[serde(default = "default_qr_prefix")]
    pub qr_prefix: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_capture_interval_ms() -> u64 {
    1000
}
fn default_qr_prefix() -> String {
    organizer_core::QR_CODE_PREFIX.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            capture_interval_ms: default_capture_interval_ms(),
            qr_prefix: default_qr_prefix(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from disk, returning `AppConfig::default()` if the file
/// does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the config directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DisplayOrganizer"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("display-organizer"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DisplayOrganizer")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_has_expected_intervals() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert – pacing defaults match the original mobile app
        assert_eq!(cfg.session.poll_interval_ms, 500);
        assert_eq!(cfg.session.capture_interval_ms, 1000);
    }

    #[test]
    fn test_app_config_default_qr_prefix_matches_core() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.session.qr_prefix, organizer_core::QR_CODE_PREFIX);
    }

    #[test]
    fn test_app_config_default_auth_token_is_empty() {
        // An empty token means "not yet configured"; the CLI refuses to run
        // without one unless it is overridden.
        let cfg = AppConfig::default();
        assert!(cfg.api.auth_token.is_empty());
    }

    #[test]
    fn test_app_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.api.base_url = "https://bridge.example.com".to_string();
        cfg.api.auth_token = "tok-123".to_string();
        cfg.session.poll_interval_ms = 250;

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_api_section_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[api]
base_url = "https://bridge.example.com"
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.api.base_url, "https://bridge.example.com");
        // Unspecified fields keep their defaults
        assert_eq!(cfg.api.request_timeout_secs, 10);
        assert_eq!(cfg.session.poll_interval_ms, 500);
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let bad_toml = "[[[ not valid toml";
        let result: Result<AppConfig, toml::de::Error> = toml::from_str(bad_toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir (e.g. a stripped CI env) is also acceptable.
    }
}
