//! Monitor lifecycle tests

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::{sleep, sleep_until, Instant};

use deploywatch::errors::MonitorError;
use deploywatch::models::deployment::DeploymentStatus;
use deploywatch::monitor::stream::{StreamEvent, StreamEventKind, NO_LONGER_TRACKED};

use crate::common::{monitor, FakeControlPlane, Reply, TriggerBehavior, GRACE_PERIOD};

fn progress_statuses(events: &[StreamEvent]) -> Vec<DeploymentStatus> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            StreamEventKind::Progress { status, .. } => Some(*status),
            _ => None,
        })
        .collect()
}

fn completions(events: &[StreamEvent]) -> Vec<&StreamEventKind> {
    events
        .iter()
        .map(|e| &e.kind)
        .filter(|k| matches!(k, StreamEventKind::Completed { .. }))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_deployment_runs_to_success() {
    let fake = Arc::new(FakeControlPlane::new(vec![
        Reply::Status(DeploymentStatus::Running),
        Reply::Status(DeploymentStatus::Running),
        Reply::Status(DeploymentStatus::Success),
    ]));
    let monitor = monitor(fake.clone());

    let started = monitor.start_monitoring("app-1", false).await.unwrap();
    assert_eq!(started.status, DeploymentStatus::Queued);

    let record = monitor.get_status(&started.operation_id).unwrap();
    assert_eq!(record.status, DeploymentStatus::Queued);
    assert_eq!(record.subject_id, "app-1");
    assert!(!record.completed);
    assert_eq!(record.success, None);

    let events: Vec<_> = monitor.open_stream(&started.operation_id).collect().await;

    let record = monitor.get_status(&started.operation_id).unwrap();
    assert!(record.completed);
    assert_eq!(record.success, Some(true));
    assert_eq!(record.status, DeploymentStatus::Success);
    assert!(record.finished_at.is_some());

    assert_eq!(events[0].event_name(), "status");
    assert_eq!(
        progress_statuses(&events),
        vec![
            DeploymentStatus::Running,
            DeploymentStatus::Running,
            DeploymentStatus::Success
        ]
    );
    assert_eq!(completions(&events).len(), 1);
    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(StreamEventKind::Completed { success: true, .. })
    ));

    // A late observer still gets the full history and the completion
    let late: Vec<_> = monitor.open_stream(&started.operation_id).collect().await;
    assert_eq!(progress_statuses(&late), progress_statuses(&events));
    assert_eq!(completions(&late).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_is_terminal() {
    let fake = Arc::new(
        FakeControlPlane::new(vec![Reply::Status(DeploymentStatus::Failed)])
            .with_fallback(Reply::Status(DeploymentStatus::Success)),
    );
    let monitor = monitor(fake.clone());
    let started = monitor.start_monitoring("app-1", true).await.unwrap();

    sleep(Duration::from_secs(6)).await;
    let first = monitor.get_status(&started.operation_id).unwrap();
    assert!(first.completed);
    assert_eq!(first.success, Some(false));

    sleep(Duration::from_secs(60)).await;
    let later = monitor.get_status(&started.operation_id).unwrap();
    assert_eq!(later.status, DeploymentStatus::Failed);
    assert_eq!(later.success, Some(false));
    assert_eq!(later.finished_at, first.finished_at);
    assert_eq!(later.progress_events.len(), 1);
    assert_eq!(fake.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_never_complete() {
    let fake = Arc::new(FakeControlPlane::new(vec![]).with_fallback(Reply::Hang));
    let monitor = monitor(fake.clone());
    let started = monitor.start_monitoring("app-1", false).await.unwrap();

    sleep(Duration::from_secs(120)).await;

    let record = monitor.get_status(&started.operation_id).unwrap();
    assert!(!record.completed);
    assert_eq!(record.success, None);
    assert!(record.progress_events.is_empty());
    assert!(fake.status_calls() >= 10);
    assert_eq!(monitor.running_tasks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_absorbed() {
    let fake = Arc::new(FakeControlPlane::new(vec![
        Reply::Transient,
        Reply::Status(DeploymentStatus::Running),
        Reply::Transient,
        Reply::Hang,
        Reply::Status(DeploymentStatus::Success),
    ]));
    let monitor = monitor(fake.clone());
    let started = monitor.start_monitoring("app-1", false).await.unwrap();

    let events: Vec<_> = monitor.open_stream(&started.operation_id).collect().await;

    assert_eq!(
        progress_statuses(&events),
        vec![DeploymentStatus::Running, DeploymentStatus::Success]
    );
    assert!(events
        .iter()
        .all(|e| !matches!(e.kind, StreamEventKind::Error { .. })));
    assert_eq!(monitor.get_status(&started.operation_id).unwrap().success, Some(true));
}

#[tokio::test(start_paused = true)]
async fn test_fatal_failure_completes_as_monitoring_error() {
    let fake = Arc::new(FakeControlPlane::new(vec![
        Reply::Status(DeploymentStatus::Running),
        Reply::Fatal,
    ]));
    let monitor = monitor(fake.clone());
    let started = monitor.start_monitoring("app-1", false).await.unwrap();

    let events: Vec<_> = monitor.open_stream(&started.operation_id).collect().await;

    let record = monitor.get_status(&started.operation_id).unwrap();
    assert_eq!(record.status, DeploymentStatus::MonitoringError);
    assert!(record.completed);
    assert_eq!(record.success, Some(false));

    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(StreamEventKind::Completed {
            status: DeploymentStatus::MonitoringError,
            success: false,
            ..
        })
    ));

    // No further polling after failing closed
    let calls = fake.status_calls();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(fake.status_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_failures() {
    let fake = Arc::new(FakeControlPlane::new(vec![]).with_trigger(TriggerBehavior::Fail));
    let monitor = monitor(fake);
    let result = monitor.start_monitoring("app-1", false).await;
    assert!(matches!(result, Err(MonitorError::TriggerFailed(_))));
    assert!(monitor.list_active().is_empty());

    let fake = Arc::new(FakeControlPlane::new(vec![]).with_trigger(TriggerBehavior::MissingId));
    let monitor = crate::common::monitor(fake);
    let result = monitor.start_monitoring("app-1", false).await;
    assert!(matches!(result, Err(MonitorError::MissingOperationId)));
    assert_eq!(monitor.running_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_monitoring() {
    let fake = Arc::new(FakeControlPlane::new(vec![]));
    let monitor = monitor(fake.clone());

    assert!(!monitor.stop_monitoring("unknown"));

    let started = monitor.start_monitoring("app-1", false).await.unwrap();
    let mut events = Box::pin(monitor.open_stream(&started.operation_id));
    assert_eq!(events.next().await.unwrap().event_name(), "status");

    sleep(Duration::from_secs(11)).await;
    assert!(monitor.stop_monitoring(&started.operation_id));
    assert!(monitor.get_status(&started.operation_id).is_none());
    assert!(!monitor.stop_monitoring(&started.operation_id));
    assert_eq!(monitor.running_tasks(), 0);

    // The poller is gone
    let calls = fake.status_calls();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(fake.status_calls(), calls);

    // The attached stream notices the removal on its next check and ends
    let rest: Vec<_> = events.collect().await;
    match rest.last().map(|e| &e.kind) {
        Some(StreamEventKind::Error { message }) => assert_eq!(message, NO_LONGER_TRACKED),
        other => panic!("expected error event, got {:?}", other),
    }
    assert!(completions(&rest).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_and_restart_same_operation() {
    let fake = Arc::new(FakeControlPlane::new(vec![]).with_trigger(TriggerBehavior::Fixed("op-7")));
    let monitor = monitor(fake.clone());

    monitor.start_monitoring("app-1", false).await.unwrap();
    monitor.start_monitoring("app-1", true).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(monitor.running_tasks(), 1);

    assert!(monitor.stop_monitoring("op-7"));
    assert!(monitor.get_status("op-7").is_none());
    assert_eq!(monitor.running_tasks(), 0);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(fake.status_calls(), 0);

    monitor.start_monitoring("app-1", false).await.unwrap();
    sleep(Duration::from_secs(6)).await;
    assert_eq!(fake.status_calls(), 1);
    assert_eq!(monitor.running_tasks(), 1);
    let record = monitor.get_status("op-7").unwrap();
    assert_eq!(record.status, DeploymentStatus::Running);
    assert!(!record.completed);
}

#[tokio::test(start_paused = true)]
async fn test_grace_period_eviction() {
    let start = Instant::now();
    let fake = Arc::new(FakeControlPlane::new(vec![
        Reply::Status(DeploymentStatus::Running),
        Reply::Status(DeploymentStatus::Cancelled),
    ]));
    let monitor = monitor(fake);
    let started = monitor.start_monitoring("app-1", false).await.unwrap();

    // Completes on the second poll, 10s in
    let completed_at = start + Duration::from_secs(10);

    sleep_until(completed_at + GRACE_PERIOD - Duration::from_secs(1)).await;
    let record = monitor.get_status(&started.operation_id).unwrap();
    assert!(record.completed);
    assert_eq!(record.status, DeploymentStatus::Cancelled);
    assert_eq!(monitor.list_active().len(), 1);

    sleep_until(completed_at + GRACE_PERIOD + Duration::from_secs(1)).await;
    assert!(monitor.get_status(&started.operation_id).is_none());
    assert!(monitor.list_active().is_empty());
    assert_eq!(monitor.running_tasks(), 0);

    let events: Vec<_> = monitor.open_stream(&started.operation_id).collect().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name(), "error");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_everything() {
    let fake = Arc::new(FakeControlPlane::new(vec![]));
    let monitor = monitor(fake.clone());

    let first = monitor.start_monitoring("app-1", false).await.unwrap();
    let second = monitor.start_monitoring("app-2", false).await.unwrap();
    assert_ne!(first.operation_id, second.operation_id);
    assert_eq!(monitor.list_active().len(), 2);

    sleep(Duration::from_secs(7)).await;
    monitor.shutdown().await.unwrap();
    assert_eq!(monitor.running_tasks(), 0);

    let calls = fake.status_calls();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(fake.status_calls(), calls);

    let events: Vec<_> = monitor.open_stream(&first.operation_id).collect().await;
    assert!(events.last().unwrap().is_terminal());

    let result = monitor.start_monitoring("app-3", false).await;
    assert!(matches!(result, Err(MonitorError::ShutdownError(_))));
}
