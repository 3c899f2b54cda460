//! Monitor API models

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Start monitoring request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMonitoringRequest {
    pub subject_id: String,

    #[serde(default)]
    pub force: bool,
}

/// Start monitoring response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMonitoringResponse {
    pub operation_id: String,
    pub status: String,
}

/// Stop monitoring response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopMonitoringResponse {
    pub operation_id: String,
    pub stopped: bool,
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
