//! Logging configuration

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::MonitorError;
use crate::settings::Settings;

/// Default filter when `RUST_LOG` is not set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging options
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub log_level: LogLevel,

    /// One JSON object per line instead of human readable output
    pub json_format: bool,
}

impl LogOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            log_level: settings.log_level,
            json_format: settings.json_logs,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.as_filter()))
    }
}

/// Install the global subscriber writing to stdout
pub fn init_logging(options: LogOptions) -> Result<(), MonitorError> {
    let subscriber = tracing_subscriber::registry().with(options.filter());

    let installed = if options.json_format {
        subscriber.with(fmt::layer().json()).try_init()
    } else {
        subscriber.with(fmt::layer().with_target(false)).try_init()
    };
    installed.map_err(|e| MonitorError::ConfigError(format!("Unable to install logger: {}", e)))
}
