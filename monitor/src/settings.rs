//! Settings file management

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::MonitorError;
use crate::logs::LogLevel;

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Control-plane configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Local HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Enable local HTTP server
    #[serde(default = "default_true")]
    pub enable_server: bool,

    /// Deployment monitor configuration
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Maximum delay for graceful shutdown in seconds
    #[serde(default = "default_max_shutdown_delay")]
    pub max_shutdown_delay_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_shutdown_delay() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            backend: BackendSettings::default(),
            server: ServerSettings::default(),
            enable_server: true,
            monitor: MonitorSettings::default(),
            max_shutdown_delay_secs: default_max_shutdown_delay(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub async fn load(path: &Path) -> Result<Self, MonitorError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            MonitorError::ConfigError(format!("Unable to read {}: {}", path.display(), e))
        })?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }
}

/// Control-plane API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the control-plane API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Bearer token
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Deployment monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Status polling interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout of a single status call in seconds
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,

    /// Event stream heartbeat interval in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// How long completed deployments stay queryable, in seconds
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_status_timeout() -> u64 {
    3
}

fn default_heartbeat_interval() -> u64 {
    2
}

fn default_grace_period() -> u64 {
    300
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            status_timeout_secs: default_status_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            grace_period_secs: default_grace_period(),
        }
    }
}
