//! Control-plane collaborator interface

use async_trait::async_trait;

use crate::errors::{MonitorError, PollError};
use crate::models::deployment::{DeploymentStatus, RemoteStatus};

/// Result of a successful trigger call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerReceipt {
    pub operation_id: String,

    /// Initial status, when the control plane reports one
    pub status: Option<DeploymentStatus>,
}

/// The remote control plane that runs deployments
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Trigger a deployment of `subject_id`.
    ///
    /// Fails with [`MonitorError::TriggerFailed`] or
    /// [`MonitorError::MissingOperationId`].
    async fn trigger(&self, subject_id: &str, force: bool) -> Result<TriggerReceipt, MonitorError>;

    /// Fetch the current status of one operation
    async fn fetch_status(&self, operation_id: &str) -> Result<RemoteStatus, PollError>;
}
