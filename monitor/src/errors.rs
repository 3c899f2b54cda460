//! Error types for the deployment monitor

use thiserror::Error;

/// Main error type for the deployment monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to trigger deployment: {0}")]
    TriggerFailed(String),

    #[error("Control plane response did not contain an operation id")]
    MissingOperationId,

    #[error("Operation not tracked: {0}")]
    NotTracked(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for MonitorError {
    fn from(err: anyhow::Error) -> Self {
        MonitorError::Internal(err.to_string())
    }
}

/// Outcome of a failed status poll, as seen by the poller
///
/// Transport failures, timeouts and non-2xx responses are transient. A 2xx
/// response that cannot be understood is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("transient poll failure: {0}")]
    Transient(String),

    #[error("fatal poll failure: {0}")]
    Fatal(String),
}

impl PollError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PollError::Transient(_))
    }
}

impl From<MonitorError> for PollError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::HttpError(e) if e.is_decode() => PollError::Fatal(e.to_string()),
            MonitorError::JsonError(e) => PollError::Fatal(e.to_string()),
            other => PollError::Transient(other.to_string()),
        }
    }
}
