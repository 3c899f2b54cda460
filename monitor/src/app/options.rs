//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;
use tracing::warn;

use crate::monitor::service::MonitorOptions;
use crate::monitor::{poller, stream};
use crate::settings::Settings;

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Control-plane API base URL
    pub backend_base_url: String,

    /// Bearer token for the control plane
    pub backend_api_token: Option<SecretString>,

    /// Timeout applied to every control-plane request
    pub backend_request_timeout: Duration,

    /// Enable local HTTP server
    pub enable_server: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Deployment monitor options
    pub monitor: MonitorOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            backend_base_url: "http://localhost:8000/api/v1".to_string(),
            backend_api_token: None,
            backend_request_timeout: Duration::from_secs(30),
            enable_server: true,
            server: ServerOptions::default(),
            monitor: MonitorOptions::default(),
        }
    }
}

impl AppOptions {
    /// Build options from the settings file
    pub fn from_settings(settings: &Settings) -> Self {
        let poll_interval = Duration::from_secs(settings.monitor.poll_interval_secs.max(1));
        let mut status_timeout = Duration::from_secs(settings.monitor.status_timeout_secs);
        if status_timeout >= poll_interval || status_timeout.is_zero() {
            let clamped = poll_interval.mul_f64(0.6);
            warn!(
                "status_timeout_secs ({:?}) must be positive and below poll_interval_secs ({:?}), using {:?}",
                status_timeout, poll_interval, clamped
            );
            status_timeout = clamped;
        }

        Self {
            lifecycle: LifecycleOptions {
                max_shutdown_delay: Duration::from_secs(settings.max_shutdown_delay_secs),
            },
            backend_base_url: settings.backend.base_url.clone(),
            backend_api_token: settings
                .backend
                .api_token
                .clone()
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            backend_request_timeout: Duration::from_secs(settings.backend.request_timeout_secs),
            enable_server: settings.enable_server,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            monitor: MonitorOptions {
                poller: poller::Options {
                    interval: poll_interval,
                    status_timeout,
                },
                stream: stream::Options {
                    heartbeat_interval: Duration::from_secs(
                        settings.monitor.heartbeat_interval_secs.max(1),
                    ),
                },
                grace_period: Duration::from_secs(settings.monitor.grace_period_secs),
            },
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
