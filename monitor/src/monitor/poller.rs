//! Status poller for one in-flight deployment

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::errors::PollError;
use crate::monitor::control_plane::ControlPlane;
use crate::monitor::registry::{write_record, SharedRecord};

/// Poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Upper bound on a single status call; shorter than `interval`
    pub status_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            status_timeout: Duration::from_secs(3),
        }
    }
}

/// Why a poller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The record reached a terminal status
    Completed,

    /// The shutdown signal fired first
    Cancelled,
}

/// Poll the control plane until the record completes or the signal fires
pub async fn run<C, S, F>(
    options: &Options,
    operation_id: &str,
    record: &SharedRecord,
    control_plane: &C,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Outcome
where
    C: ControlPlane + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Monitoring deployment {}", operation_id);

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Stopped monitoring deployment {}", operation_id);
                return Outcome::Cancelled;
            }
            _ = sleep_fn(options.interval) => {}
        }

        let result = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Stopped monitoring deployment {} mid-poll", operation_id);
                return Outcome::Cancelled;
            }
            result = tokio::time::timeout(
                options.status_timeout,
                control_plane.fetch_status(operation_id),
            ) => result,
        };

        let remote = match result {
            Ok(Ok(remote)) => remote,
            Ok(Err(PollError::Transient(e))) => {
                warn!("Status poll for {} failed, will retry: {}", operation_id, e);
                continue;
            }
            Err(_) => {
                warn!(
                    "Status poll for {} timed out after {:?}, will retry",
                    operation_id, options.status_timeout
                );
                continue;
            }
            Ok(Err(PollError::Fatal(e))) => {
                error!(
                    "Monitoring of {} failed (not a deployment failure): {}",
                    operation_id, e
                );
                write_record(record).fail_monitoring(Utc::now());
                return Outcome::Completed;
            }
        };

        let status = remote.status;
        let completed = write_record(record).observe(remote, Utc::now());
        debug!("Deployment {} is {}", operation_id, status);

        if completed {
            info!("Deployment {} finished with status {}", operation_id, status);
            return Outcome::Completed;
        }
    }
}
