//! Grace-period eviction of completed deployments

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use crate::monitor::registry::{Registry, SharedRecord};

/// Keep `record` queryable for `grace_period`, then drop it from the registry.
///
/// Returns `true` if this call removed the entry. Nothing is removed when the
/// signal fires first or the entry was already replaced or removed.
pub async fn evict_after_grace<R, S, F>(
    registry: &R,
    operation_id: &str,
    record: &SharedRecord,
    grace_period: Duration,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> bool
where
    R: Registry + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    debug!(
        "Scheduling eviction of deployment {} in {:?}",
        operation_id, grace_period
    );

    tokio::select! {
        _ = &mut shutdown_signal => {
            debug!("Eviction of deployment {} cancelled", operation_id);
            return false;
        }
        _ = sleep_fn(grace_period) => {}
    }

    let removed = registry.remove_if_same(operation_id, record);
    if removed {
        info!("Evicted completed deployment {}", operation_id);
    }
    removed
}
