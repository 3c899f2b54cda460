//! HTTP request handlers

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{Stream, StreamExt};
use openapi_server::models::{
    ErrorResponse, HealthResponse, StartMonitoringRequest, StartMonitoringResponse,
    StopMonitoringResponse, VersionResponse,
};
use tracing::error;

use crate::errors::MonitorError;
use crate::models::deployment::DeploymentRecord;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Error response with status code
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_tracked(operation_id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: MonitorError::NotTracked(operation_id.to_string()).to_string(),
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        let status = match &err {
            MonitorError::TriggerFailed(_) | MonitorError::MissingOperationId => {
                StatusCode::BAD_GATEWAY
            }
            MonitorError::NotTracked(_) => StatusCode::NOT_FOUND,
            MonitorError::ShutdownError(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "deploywatch".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Trigger a deployment and start monitoring it
pub async fn start_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<StartMonitoringRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = state
        .monitor
        .start_monitoring(&request.subject_id, request.force)
        .await
        .map_err(|e| {
            error!("Failed to start monitoring {}: {}", request.subject_id, e);
            ApiError::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(StartMonitoringResponse {
            operation_id: started.operation_id,
            status: started.status.to_string(),
        }),
    ))
}

/// All tracked deployments
pub async fn list_handler(
    State(state): State<Arc<ServerState>>,
) -> Json<HashMap<String, DeploymentRecord>> {
    Json(state.monitor.list_active())
}

/// One tracked deployment
pub async fn status_handler(
    State(state): State<Arc<ServerState>>,
    Path(operation_id): Path<String>,
) -> Result<Json<DeploymentRecord>, ApiError> {
    state
        .monitor
        .get_status(&operation_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_tracked(&operation_id))
}

/// Stop monitoring a deployment
pub async fn stop_handler(
    State(state): State<Arc<ServerState>>,
    Path(operation_id): Path<String>,
) -> Json<StopMonitoringResponse> {
    let stopped = state.monitor.stop_monitoring(&operation_id);
    Json(StopMonitoringResponse {
        operation_id,
        stopped,
    })
}

/// Stream deployment events via SSE
pub async fn events_handler(
    State(state): State<Arc<ServerState>>,
    Path(operation_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.monitor.open_stream(&operation_id).filter_map(|event| async move {
        match Event::default().event(event.event_name()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                error!(
                    "Failed to serialize {} event for {}: {}",
                    event.event_name(),
                    event.operation_id,
                    e
                );
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
