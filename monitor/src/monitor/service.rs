//! Deployment monitor: start, query, stream and stop monitoring

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::{FutureExt, Stream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::MonitorError;
use crate::models::deployment::{DeploymentRecord, DeploymentStatus};
use crate::monitor::cleanup::evict_after_grace;
use crate::monitor::control_plane::ControlPlane;
use crate::monitor::poller::{self, Outcome};
use crate::monitor::registry::{write_record, Registry, SharedRecord};
use crate::monitor::stream::{self, StreamEvent};

/// Monitor options
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub poller: poller::Options,

    pub stream: stream::Options,

    /// How long a completed record stays queryable
    pub grace_period: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poller: poller::Options::default(),
            stream: stream::Options::default(),
            grace_period: Duration::from_secs(300),
        }
    }
}

/// Result of a successful start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedMonitoring {
    pub operation_id: String,
    pub status: DeploymentStatus,
}

/// Background task owning one operation's poller and eviction
struct MonitorTask {
    record: SharedRecord,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

type Tasks = Arc<Mutex<HashMap<String, MonitorTask>>>;

/// Tracks triggered deployments until they complete and are evicted
pub struct DeploymentMonitor {
    registry: Arc<dyn Registry>,
    control_plane: Arc<dyn ControlPlane>,
    options: MonitorOptions,
    tasks: Tasks,
    shutdown: CancellationToken,
}

impl DeploymentMonitor {
    pub fn new(
        registry: Arc<dyn Registry>,
        control_plane: Arc<dyn ControlPlane>,
        options: MonitorOptions,
    ) -> Self {
        Self {
            registry,
            control_plane,
            options,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// Trigger a deployment of `subject_id` and start monitoring it
    pub async fn start_monitoring(
        &self,
        subject_id: &str,
        force: bool,
    ) -> Result<StartedMonitoring, MonitorError> {
        if self.shutdown.is_cancelled() {
            return Err(MonitorError::ShutdownError(
                "monitor is shutting down".to_string(),
            ));
        }

        let receipt = self.control_plane.trigger(subject_id, force).await?;
        let operation_id = receipt.operation_id;
        let status = receipt
            .status
            .filter(|s| !s.is_terminal())
            .unwrap_or(DeploymentStatus::Started);

        let record: SharedRecord = Arc::new(RwLock::new(DeploymentRecord::new(
            operation_id.clone(),
            subject_id,
            status,
        )));

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = tasks.remove(&operation_id) {
            warn!(
                "Deployment {} was already monitored, restarting its monitor",
                operation_id
            );
            previous.cancel.cancel();
        }

        self.registry.put(&operation_id, record.clone());

        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(monitor_operation(
            operation_id.clone(),
            record.clone(),
            self.registry.clone(),
            self.control_plane.clone(),
            self.options.clone(),
            cancel.clone(),
            self.tasks.clone(),
        ));
        tasks.insert(
            operation_id.clone(),
            MonitorTask {
                record,
                cancel,
                handle,
            },
        );

        info!(
            "Started monitoring deployment {} of {} (force: {})",
            operation_id, subject_id, force
        );
        Ok(StartedMonitoring {
            operation_id,
            status,
        })
    }

    /// Current state of one operation, `None` if it is not tracked
    pub fn get_status(&self, operation_id: &str) -> Option<DeploymentRecord> {
        self.registry.snapshot(operation_id)
    }

    /// Every tracked operation, including completed ones awaiting eviction
    pub fn list_active(&self) -> HashMap<String, DeploymentRecord> {
        self.registry.list_all()
    }

    /// Cancel monitoring and forget the operation immediately.
    ///
    /// Returns whether the operation was being tracked.
    pub fn stop_monitoring(&self, operation_id: &str) -> bool {
        // Same lock as start_monitoring, so a concurrent restart is never removed
        let removed = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(task) = tasks.remove(operation_id) {
                task.cancel.cancel();
            }
            self.registry.remove(operation_id).is_some()
        };
        if removed {
            info!("Stopped monitoring deployment {}", operation_id);
        }
        removed
    }

    /// Open an event stream for one operation
    pub fn open_stream(&self, operation_id: &str) -> impl Stream<Item = StreamEvent> + Send + 'static {
        stream::open(
            self.registry.clone(),
            operation_id.to_string(),
            self.options.stream.clone(),
            self.shutdown.clone(),
        )
    }

    /// Number of operations with a live poller or pending eviction
    pub fn running_tasks(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.len()
    }

    /// Cancel every poller and pending eviction and wait for them to exit
    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        info!("Shutting down deployment monitor...");
        self.shutdown.cancel();

        let handles: Vec<(String, JoinHandle<()>)> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain().map(|(id, task)| (id, task.handle)).collect()
        };

        for (operation_id, handle) in handles {
            handle.await.map_err(|e| {
                MonitorError::ShutdownError(format!("monitor of {}: {}", operation_id, e))
            })?;
        }
        Ok(())
    }
}

/// Poll until completion, then keep the record for the grace period
async fn monitor_operation(
    operation_id: String,
    record: SharedRecord,
    registry: Arc<dyn Registry>,
    control_plane: Arc<dyn ControlPlane>,
    options: MonitorOptions,
    cancel: CancellationToken,
    tasks: Tasks,
) {
    let polled = AssertUnwindSafe(poller::run(
        &options.poller,
        &operation_id,
        &record,
        control_plane.as_ref(),
        tokio::time::sleep,
        Box::pin(cancel.clone().cancelled_owned()),
    ))
    .catch_unwind()
    .await;

    let completed = match polled {
        Ok(Outcome::Completed) => true,
        Ok(Outcome::Cancelled) => false,
        Err(_) => {
            error!(
                "Poller for deployment {} panicked, marking it as a monitoring error",
                operation_id
            );
            write_record(&record).fail_monitoring(Utc::now());
            true
        }
    };

    if completed {
        evict_after_grace(
            registry.as_ref(),
            &operation_id,
            &record,
            options.grace_period,
            tokio::time::sleep,
            Box::pin(cancel.cancelled_owned()),
        )
        .await;
    }

    let mut tasks = tasks.lock().unwrap_or_else(|e| e.into_inner());
    if tasks
        .get(&operation_id)
        .is_some_and(|task| Arc::ptr_eq(&task.record, &record))
    {
        tasks.remove(&operation_id);
    }
}
