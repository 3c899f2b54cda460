//! API models

use serde::{Deserialize, Serialize};

/// Trigger deployment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDeploymentRequest {
    /// Identifier of the resource to deploy (e.g. an application uuid)
    pub uuid: String,
    pub force: bool,
}

/// One entry of the trigger response's `deployments` array
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentReceipt {
    #[serde(default)]
    pub deployment_uuid: Option<String>,

    #[serde(default)]
    pub resource_uuid: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Trigger deployment response
///
/// The control plane answers either with a top-level `deployment_uuid` or with a
/// `deployments` array; both shapes are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerDeploymentResponse {
    #[serde(default)]
    pub deployment_uuid: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub deployments: Vec<DeploymentReceipt>,
}

impl TriggerDeploymentResponse {
    /// The operation identifier assigned by the control plane, if any
    pub fn operation_id(&self) -> Option<&str> {
        self.deployment_uuid
            .as_deref()
            .or_else(|| {
                self.deployments
                    .first()
                    .and_then(|d| d.deployment_uuid.as_deref())
            })
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Deployment status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentStatusResponse {
    pub status: String,

    #[serde(default)]
    pub started_at: Option<String>,

    #[serde(default)]
    pub finished_at: Option<String>,

    /// Every other field the control plane returned
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
