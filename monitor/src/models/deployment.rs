//! Deployment models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployment status, mirroring the control plane's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Triggered, no status observed yet
    Started,
    Queued,
    Running,
    Success,
    Failed,
    Cancelled,
    /// The monitor itself failed; terminal with `success = false`
    MonitoringError,
}

impl DeploymentStatus {
    /// Whether no further transition can occur from this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Success
                | DeploymentStatus::Failed
                | DeploymentStatus::Cancelled
                | DeploymentStatus::MonitoringError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Started => "started",
            DeploymentStatus::Queued => "queued",
            DeploymentStatus::Running => "running",
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::Cancelled => "cancelled",
            DeploymentStatus::MonitoringError => "monitoring_error",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    /// Parse a status reported by the control plane, including its aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "started" => Ok(DeploymentStatus::Started),
            "queued" | "pending" => Ok(DeploymentStatus::Queued),
            "running" | "in_progress" => Ok(DeploymentStatus::Running),
            "success" | "finished" => Ok(DeploymentStatus::Success),
            "failed" | "error" => Ok(DeploymentStatus::Failed),
            "cancelled" | "canceled" | "cancelled-by-user" => Ok(DeploymentStatus::Cancelled),
            "monitoring_error" => Ok(DeploymentStatus::MonitoringError),
            _ => Err(format!("Unknown deployment status: {}", s)),
        }
    }
}

/// One observation appended to a record's history during polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub timestamp: DateTime<Utc>,
    pub status: DeploymentStatus,
    pub details: serde_json::Value,
}

/// Status as reported by one poll of the control plane
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStatus {
    pub status: DeploymentStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub details: serde_json::Value,
}

impl RemoteStatus {
    pub fn new(status: DeploymentStatus) -> Self {
        Self {
            status,
            started_at: None,
            finished_at: None,
            details: serde_json::Value::Object(Default::default()),
        }
    }
}

/// Monitoring state for one triggered operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Identifier assigned by the control plane
    pub operation_id: String,

    /// Resource the operation acts on
    pub subject_id: String,

    pub status: DeploymentStatus,

    pub started_at: DateTime<Utc>,

    pub last_checked_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Append-only, in observation order
    pub progress_events: Vec<ProgressEvent>,

    pub completed: bool,

    /// `None` until completed
    pub success: Option<bool>,
}

impl DeploymentRecord {
    pub fn new(
        operation_id: impl Into<String>,
        subject_id: impl Into<String>,
        status: DeploymentStatus,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            subject_id: subject_id.into(),
            status,
            started_at: Utc::now(),
            last_checked_at: None,
            finished_at: None,
            progress_events: Vec::new(),
            completed: false,
            success: None,
        }
    }

    /// Apply one successful poll. Returns `true` if the record just completed.
    ///
    /// A completed record is never modified again.
    pub fn observe(&mut self, remote: RemoteStatus, now: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }

        self.progress_events.push(ProgressEvent {
            timestamp: now,
            status: remote.status,
            details: remote.details,
        });
        self.last_checked_at = Some(now);
        self.status = remote.status;

        if remote.status.is_terminal() {
            self.completed = true;
            self.success = Some(remote.status == DeploymentStatus::Success);
            self.finished_at = Some(remote.finished_at.unwrap_or(now));
            return true;
        }
        false
    }

    /// Mark the record terminal because monitoring itself broke.
    /// Returns `false` if the record had already completed.
    pub fn fail_monitoring(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }
        self.status = DeploymentStatus::MonitoringError;
        self.completed = true;
        self.success = Some(false);
        self.finished_at = Some(now);
        true
    }
}
