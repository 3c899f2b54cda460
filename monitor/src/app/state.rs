//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::MonitorError;
use crate::http::client::HttpClient;
use crate::monitor::registry::InMemoryRegistry;
use crate::monitor::service::DeploymentMonitor;

/// Main application state
pub struct AppState {
    /// HTTP client for control-plane communication
    pub http_client: Arc<HttpClient>,

    /// Deployment monitor
    pub monitor: Arc<DeploymentMonitor>,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions) -> Result<Self, MonitorError> {
        info!("Initializing application state...");

        let http_client = Arc::new(HttpClient::new(
            &options.backend_base_url,
            options.backend_api_token.clone(),
            options.backend_request_timeout,
        )?);

        let monitor = Arc::new(DeploymentMonitor::new(
            Arc::new(InMemoryRegistry::new()),
            http_client.clone(),
            options.monitor.clone(),
        ));

        Ok(Self {
            http_client,
            monitor,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        info!("Shutting down application state...");
        self.monitor.shutdown().await
    }
}
