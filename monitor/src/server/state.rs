//! Server state

use std::sync::Arc;

use crate::monitor::service::DeploymentMonitor;

/// Server state shared across handlers
pub struct ServerState {
    pub monitor: Arc<DeploymentMonitor>,
}

impl ServerState {
    pub fn new(monitor: Arc<DeploymentMonitor>) -> Self {
        Self { monitor }
    }
}
