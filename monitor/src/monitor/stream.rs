//! Live, replayable event stream for one deployment

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::models::deployment::{DeploymentStatus, ProgressEvent};
use crate::monitor::registry::{read_record, Registry, SharedRecord};

pub const NOT_TRACKED: &str = "operation not tracked";
pub const NO_LONGER_TRACKED: &str = "operation no longer tracked";
pub const SHUTTING_DOWN: &str = "monitor shutting down";

/// Stream options
#[derive(Debug, Clone)]
pub struct Options {
    /// How often the record is re-checked; a heartbeat is sent when nothing is new
    pub heartbeat_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(2),
        }
    }
}

/// Payload of a stream event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEventKind {
    /// Snapshot at attach time
    Status {
        status: DeploymentStatus,
        started_at: DateTime<Utc>,
    },
    Progress {
        /// Position in the record's progress history
        index: usize,
        status: DeploymentStatus,
        details: serde_json::Value,
        observed_at: DateTime<Utc>,
    },
    Heartbeat,
    Completed {
        status: DeploymentStatus,
        success: bool,
        finished_at: Option<DateTime<Utc>>,
    },
    Error {
        message: String,
    },
}

/// One event delivered to an observer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    /// Per-stream logical timestamp, starting at 0
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub operation_id: String,
    #[serde(flatten)]
    pub kind: StreamEventKind,
}

impl StreamEvent {
    /// Name used for the SSE `event:` field
    pub fn event_name(&self) -> &'static str {
        match self.kind {
            StreamEventKind::Status { .. } => "status",
            StreamEventKind::Progress { .. } => "progress",
            StreamEventKind::Heartbeat => "heartbeat",
            StreamEventKind::Completed { .. } => "completed",
            StreamEventKind::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            StreamEventKind::Completed { .. } | StreamEventKind::Error { .. }
        )
    }
}

struct Sequencer {
    operation_id: String,
    seq: u64,
}

impl Sequencer {
    fn next(&mut self, kind: StreamEventKind) -> StreamEvent {
        let event = StreamEvent {
            seq: self.seq,
            timestamp: Utc::now(),
            operation_id: self.operation_id.clone(),
            kind,
        };
        self.seq += 1;
        event
    }
}

/// What a record holds beyond a stream's cursor
struct Unseen {
    events: Vec<ProgressEvent>,
    completion: Option<(DeploymentStatus, bool, Option<DateTime<Utc>>)>,
}

fn unseen(record: &SharedRecord, cursor: usize) -> Unseen {
    let record = read_record(record);
    Unseen {
        events: record.progress_events.get(cursor..).unwrap_or_default().to_vec(),
        completion: record
            .completed
            .then(|| (record.status, record.success.unwrap_or(false), record.finished_at)),
    }
}

struct StreamDropGuard {
    stream_id: Uuid,
    operation_id: String,
}

impl Drop for StreamDropGuard {
    fn drop(&mut self) {
        debug!(
            stream_id = %self.stream_id,
            operation_id = %self.operation_id,
            "Deployment event stream closed"
        );
    }
}

/// Open an event stream for `operation_id`.
///
/// The stream replays the full progress history from the start, then follows
/// the record until it completes or stops being tracked. Each stream keeps its
/// own cursor. It also ends, with an error event, once `shutdown` fires.
pub fn open(
    registry: Arc<dyn Registry>,
    operation_id: String,
    options: Options,
    shutdown: CancellationToken,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    let stream_id = Uuid::new_v4();
    debug!(
        stream_id = %stream_id,
        operation_id = %operation_id,
        "Deployment event stream opened"
    );

    let guard = StreamDropGuard {
        stream_id,
        operation_id: operation_id.clone(),
    };

    async_stream::stream! {
        let _guard = guard;
        let mut seq = Sequencer { operation_id: operation_id.clone(), seq: 0 };

        let Some(record) = registry.get(&operation_id) else {
            yield seq.next(StreamEventKind::Error { message: NOT_TRACKED.to_string() });
            return;
        };

        let (status, started_at) = {
            let snapshot = read_record(&record);
            (snapshot.status, snapshot.started_at)
        };
        yield seq.next(StreamEventKind::Status { status, started_at });

        let mut cursor = 0usize;
        let mut first = true;
        loop {
            if !first {
                let shutting_down = tokio::select! {
                    _ = shutdown.cancelled() => true,
                    _ = tokio::time::sleep(options.heartbeat_interval) => false,
                };
                if shutting_down {
                    yield seq.next(StreamEventKind::Error { message: SHUTTING_DOWN.to_string() });
                    return;
                }

                let still_tracked = registry
                    .get(&operation_id)
                    .is_some_and(|current| Arc::ptr_eq(&current, &record));
                if !still_tracked {
                    yield seq.next(StreamEventKind::Error { message: NO_LONGER_TRACKED.to_string() });
                    return;
                }
            }

            let Unseen { events, completion } = unseen(&record, cursor);
            let idle = events.is_empty();

            for event in events {
                yield seq.next(StreamEventKind::Progress {
                    index: cursor,
                    status: event.status,
                    details: event.details,
                    observed_at: event.timestamp,
                });
                cursor += 1;
            }

            if let Some((status, success, finished_at)) = completion {
                yield seq.next(StreamEventKind::Completed { status, success, finished_at });
                return;
            }

            if idle && !first {
                yield seq.next(StreamEventKind::Heartbeat);
            }
            first = false;
        }
    }
}
