//! Deployment API client

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use openapi_client::models::{
    DeploymentStatusResponse, TriggerDeploymentRequest, TriggerDeploymentResponse,
};
use tracing::{debug, warn};

use crate::errors::{MonitorError, PollError};
use crate::http::client::HttpClient;
use crate::models::deployment::{DeploymentStatus, RemoteStatus};
use crate::monitor::control_plane::{ControlPlane, TriggerReceipt};

impl HttpClient {
    /// Trigger a deployment of a resource
    pub async fn trigger_deployment(
        &self,
        subject_id: &str,
        force: bool,
    ) -> Result<TriggerDeploymentResponse, MonitorError> {
        let body = TriggerDeploymentRequest {
            uuid: subject_id.to_string(),
            force,
        };
        self.post("/deploy", &body).await
    }

    /// Get the status of one deployment
    pub async fn get_deployment_status(
        &self,
        operation_id: &str,
    ) -> Result<DeploymentStatusResponse, MonitorError> {
        let path = format!("/deployments/{}", operation_id);
        self.get(&path).await
    }
}

#[async_trait]
impl ControlPlane for HttpClient {
    async fn trigger(&self, subject_id: &str, force: bool) -> Result<TriggerReceipt, MonitorError> {
        let response = self
            .trigger_deployment(subject_id, force)
            .await
            .map_err(|e| match e {
                MonitorError::HttpError(e) if e.is_decode() => {
                    warn!("Unreadable trigger response for {}: {}", subject_id, e);
                    MonitorError::MissingOperationId
                }
                MonitorError::JsonError(e) => {
                    warn!("Unreadable trigger response for {}: {}", subject_id, e);
                    MonitorError::MissingOperationId
                }
                other => MonitorError::TriggerFailed(other.to_string()),
            })?;

        let operation_id = response
            .operation_id()
            .ok_or(MonitorError::MissingOperationId)?
            .to_string();

        let status = response.status.as_deref().and_then(|s| match s.parse() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Ignoring initial status of {}: {}", operation_id, e);
                None
            }
        });

        debug!("Triggered deployment {} for {}", operation_id, subject_id);
        Ok(TriggerReceipt {
            operation_id,
            status,
        })
    }

    async fn fetch_status(&self, operation_id: &str) -> Result<RemoteStatus, PollError> {
        let response = self.get_deployment_status(operation_id).await?;
        to_remote_status(response)
    }
}

/// Translate the control plane's status body into the internal shape
pub fn to_remote_status(response: DeploymentStatusResponse) -> Result<RemoteStatus, PollError> {
    let status = match response.status.parse().map_err(PollError::Fatal)? {
        // Only this monitor assigns these
        DeploymentStatus::Started | DeploymentStatus::MonitoringError => {
            return Err(PollError::Fatal(format!(
                "Control plane reported internal status: {}",
                response.status
            )));
        }
        status => status,
    };

    let mut details = response.extra;
    if let Some(started_at) = &response.started_at {
        details.insert("started_at".to_string(), started_at.clone().into());
    }
    if let Some(finished_at) = &response.finished_at {
        details.insert("finished_at".to_string(), finished_at.clone().into());
    }

    Ok(RemoteStatus {
        status,
        started_at: response.started_at.as_deref().and_then(parse_timestamp),
        finished_at: response.finished_at.as_deref().and_then(parse_timestamp),
        details: serde_json::Value::Object(details),
    })
}

/// Parse an RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) timestamp
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
