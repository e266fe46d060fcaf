// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            workers: None,
        }
    }
}

/// Content store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one file per record
    pub data_dir: String,
    /// HTML file served on `GET /`
    pub home_page: String,
    /// Cap on the stored record, content-type line included
    pub max_body_size: usize,
    /// How many keys to try before giving up on a create
    pub key_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            home_page: "index.html".to_string(),
            max_body_size: 65_536,
            key_attempts: 8,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
    /// Enable the best-effort per-request event log
    #[serde(default)]
    pub event_log: bool,
    #[serde(default = "default_event_info_file")]
    pub event_info_file: String,
    #[serde(default = "default_event_error_file")]
    pub event_error_file: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_event_info_file() -> String {
    "info.log".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_event_error_file() -> String {
    "error.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            access_log: true,
            access_log_format: default_access_log_format(),
            access_log_file: None,
            error_log_file: None,
            event_log: false,
            event_info_file: default_event_info_file(),
            event_error_file: default_event_error_file(),
        }
    }
}

/// Performance configuration
///
/// Both limits are off unless configured: connections are never timed out
/// and admission is bounded only by the accept backlog.
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Connection timeout in seconds
    #[serde(default)]
    pub connection_timeout: Option<u64>,
    #[serde(default)]
    pub max_connections: Option<u64>,
    /// Seconds to wait for in-flight connections after shutdown is requested
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: u64,
}

#[allow(clippy::missing_const_for_fn)]
fn default_shutdown_grace() -> u64 {
    10
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            connection_timeout: None,
            max_connections: None,
            shutdown_grace: default_shutdown_grace(),
        }
    }
}
