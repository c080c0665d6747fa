//! Configuration file management for `~/.atrium/config.toml`
//!
//! # Configuration Format
//!
//! ```toml
//! [server]
//! url = "https://abc.example.co"  # used only when ATRIUM_URL is unset
//! timeout = 30                    # HTTP request timeout, seconds
//! connection_timeout = 10         # TCP + TLS handshake, seconds
//! join_timeout = 10               # realtime join reply, seconds
//! heartbeat_interval = 25         # realtime heartbeat, seconds (0 = off)
//! max_retries = 3
//!
//! [logging]
//! level = "info"                  # trace, debug, info, warn, error, off
//! format = "compact"              # compact, json
//!
//! [storage]
//! bucket = "media"
//! public = true
//! max_bytes = 5242880
//! allowed_mime_types = ["image/png", "image/jpeg", "image/gif", "image/webp", "image/svg+xml"]
//!
//! [routes]
//! fallback = "/signin"
//! ```
//!
//! Keys never live in this file; they come from `ATRIUM_ANON_KEY` and
//! `ATRIUM_SERVICE_KEY`.

use atrium_link::{config::ENV_URL, LinkTimeouts, PlatformConfig, UploadPolicy};
use atrium_session::DEFAULT_FALLBACK;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CLIError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "~/.atrium/config.toml";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: [&str; 2] = ["compact", "json"];

/// CLI configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CLIConfiguration {
    pub server: Option<ServerConfig>,
    pub logging: Option<LoggingConfig>,
    pub storage: Option<StorageConfig>,
    pub routes: Option<RoutesConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Platform URL; `ATRIUM_URL` wins when set
    pub url: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    #[serde(default = "default_join_timeout")]
    pub join_timeout: u64,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,

    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Bucket `atrium provision-bucket` creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_public")]
    pub public: bool,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutesConfig {
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_join_timeout() -> u64 {
    10
}

fn default_heartbeat_interval() -> u64 {
    25
}

fn default_retries() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_bucket() -> String {
    "media".to_string()
}

fn default_public() -> bool {
    true
}

fn default_max_bytes() -> u64 {
    UploadPolicy::images().max_bytes.unwrap_or(5 * 1024 * 1024)
}

fn default_allowed_mime_types() -> Vec<String> {
    UploadPolicy::images().allowed_mime_types
}

fn default_fallback() -> String {
    DEFAULT_FALLBACK.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: default_timeout(),
            connection_timeout: default_connection_timeout(),
            join_timeout: default_join_timeout(),
            heartbeat_interval: default_heartbeat_interval(),
            max_retries: default_retries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            public: default_public(),
            max_bytes: default_max_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            fallback: default_fallback(),
        }
    }
}

pub fn expand_config_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    }
    path.to_path_buf()
}

pub fn default_config_path() -> PathBuf {
    expand_config_path(Path::new(DEFAULT_CONFIG_PATH))
}

impl CLIConfiguration {
    /// Load configuration from file.
    ///
    /// Returns the defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        let path = expand_config_path(path);

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            CLIError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: CLIConfiguration = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let path = expand_config_path(path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CLIError::ConfigurationError(format!("Failed to serialize: {}", e)))?;

        std::fs::write(&path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let server = self.resolved_server();
        if server.timeout == 0 {
            return Err(CLIError::ConfigurationError(
                "server.timeout must be greater than 0".into(),
            ));
        }
        if server.connection_timeout == 0 {
            return Err(CLIError::ConfigurationError(
                "server.connection_timeout must be greater than 0".into(),
            ));
        }
        if server.join_timeout == 0 {
            return Err(CLIError::ConfigurationError(
                "server.join_timeout must be greater than 0".into(),
            ));
        }

        let logging = self.resolved_logging();
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(CLIError::ConfigurationError(format!(
                "Invalid logging.level '{}'. Must be one of: {}",
                logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if !LOG_FORMATS.contains(&logging.format.to_lowercase().as_str()) {
            return Err(CLIError::ConfigurationError(format!(
                "Invalid logging.format '{}'. Must be one of: {}",
                logging.format,
                LOG_FORMATS.join(", ")
            )));
        }

        let storage = self.resolved_storage();
        if storage.bucket.trim().is_empty() {
            return Err(CLIError::ConfigurationError("storage.bucket must not be empty".into()));
        }
        if storage.max_bytes == 0 {
            return Err(CLIError::ConfigurationError(
                "storage.max_bytes must be greater than 0".into(),
            ));
        }

        if !self.resolved_routes().fallback.starts_with('/') {
            return Err(CLIError::ConfigurationError(
                "routes.fallback must be an absolute path".into(),
            ));
        }

        Ok(())
    }

    pub fn resolved_server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    pub fn resolved_logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    pub fn resolved_storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    pub fn resolved_routes(&self) -> RoutesConfig {
        self.routes.clone().unwrap_or_default()
    }

    pub fn to_link_timeouts(&self) -> LinkTimeouts {
        let server = self.resolved_server();
        LinkTimeouts::builder()
            .connection_timeout_secs(server.connection_timeout)
            .receive_timeout_secs(server.timeout)
            .join_timeout_secs(server.join_timeout)
            .heartbeat_interval_secs(server.heartbeat_interval)
            .build()
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        let storage = self.resolved_storage();
        UploadPolicy::unrestricted()
            .with_max_bytes(storage.max_bytes)
            .with_allowed_mime_types(storage.allowed_mime_types)
    }

    /// Platform config from `lookup` (normally the environment), falling
    /// back to `server.url` when the URL variable is unset.
    pub fn platform_config<F>(&self, lookup: F) -> Result<PlatformConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_url = self.resolved_server().url;
        let config = PlatformConfig::from_lookup(|name| {
            let value = lookup(name).filter(|v| !v.trim().is_empty());
            if name == ENV_URL {
                value.or_else(|| file_url.clone())
            } else {
                value
            }
        })?;
        Ok(config)
    }
}
