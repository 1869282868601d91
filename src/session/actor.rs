//! One task per session.
//!
//! The task owns the session's `Dispatcher`; everything else talks to it
//! through a bounded queue. Frames are offered with `try_send` and dropped
//! when the queue is full, so a slow analyzer shows up as gaps in the stream
//! instead of back-pressure on the HTTP handlers. Control items (exercise
//! selection, restart, stop) wait for queue space and are never dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::analysis::config::DetectorConfig;
use crate::analysis::dispatcher::{Dispatcher, SessionSummary};
use crate::analysis::exercise::ExerciseKind;
use crate::analysis::source::{self, PumpStats, SourceItem};
use crate::analysis::types::Frame;
use crate::session::events::{BroadcastObserver, SessionEvent, SessionSnapshot};
use crate::session::SessionError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    pub dropped: usize,
}

/// Cheap, cloneable access to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::Sender<SourceItem>,
    events: broadcast::Sender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    dropped: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queues frames without waiting; frames that do not fit are dropped.
    pub fn offer_frames(&self, frames: Vec<Frame>) -> Result<IngestReport, SessionError> {
        let mut report = IngestReport {
            accepted: 0,
            dropped: 0,
        };
        for frame in frames {
            match self.tx.try_send(SourceItem::Frame(frame)) {
                Ok(()) => report.accepted += 1,
                Err(mpsc::error::TrySendError::Full(_)) => report.dropped += 1,
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    return Err(SessionError::Closed(self.id))
                }
            }
        }
        if report.dropped > 0 {
            self.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
            tracing::debug!(
                session_id = %self.id,
                dropped = report.dropped,
                "Frame queue full, frames dropped"
            );
        }
        Ok(report)
    }

    pub async fn select(&self, kind: ExerciseKind) -> Result<(), SessionError> {
        self.send(SourceItem::Select(kind)).await
    }

    pub async fn restart(&self) -> Result<(), SessionError> {
        self.send(SourceItem::Restart).await
    }

    pub(crate) async fn stop(&self) -> Result<(), SessionError> {
        self.send(SourceItem::Stop).await
    }

    async fn send(&self, item: SourceItem) -> Result<(), SessionError> {
        self.tx
            .send(item)
            .await
            .map_err(|_| SessionError::Closed(self.id))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// `changed()` on the returned receiver errors once the session task exits.
    pub fn watch_snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }
}

/// Starts the session task. The returned join handle yields the summary
/// once the task sees `Stop` or every sender is gone.
pub fn spawn(
    detector: Arc<DetectorConfig>,
    initial: ExerciseKind,
    queue_capacity: usize,
) -> (SessionHandle, JoinHandle<SessionSummary>) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(queue_capacity.max(1));
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::empty(id));
    let dropped = Arc::new(AtomicU64::new(0));

    let mut dispatcher = Dispatcher::new(id, detector);
    let mut observer = BroadcastObserver::new(events.clone());
    // nobody can be subscribed yet; the snapshot carries the instructions
    dispatcher.select(initial, &mut observer);
    snapshot_tx.send_replace(snapshot_of(&dispatcher, &dropped));

    let task = tokio::spawn(run(dispatcher, observer, rx, snapshot_tx, dropped.clone()));

    tracing::info!(session_id = %id, exercise = %initial, "Session started");
    let handle = SessionHandle {
        id,
        tx,
        events,
        snapshot: snapshot_rx,
        dropped,
    };
    (handle, task)
}

async fn run(
    mut dispatcher: Dispatcher,
    mut observer: BroadcastObserver,
    mut rx: mpsc::Receiver<SourceItem>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    dropped: Arc<AtomicU64>,
) -> SessionSummary {
    let mut stats = PumpStats::default();
    while let Some(item) = rx.recv().await {
        if matches!(item, SourceItem::Select(_) | SourceItem::Restart) {
            observer.exercise_changed();
        }
        let keep_going = source::apply(item, &mut dispatcher, &mut observer, &mut stats);
        snapshot_tx.send_replace(snapshot_of(&dispatcher, &dropped));
        if !keep_going {
            break;
        }
    }
    tracing::info!(
        session_id = %dispatcher.session_id(),
        frames_analyzed = stats.frames_analyzed,
        frames_skipped = stats.frames_skipped,
        frames_dropped = dropped.load(Ordering::Relaxed),
        "Session stopped"
    );
    dispatcher.finish()
}

fn snapshot_of(dispatcher: &Dispatcher, dropped: &AtomicU64) -> SessionSnapshot {
    let (frames_analyzed, frames_skipped) = dispatcher.frame_counts();
    let last_rep = dispatcher.last_rep();
    SessionSnapshot {
        session_id: dispatcher.session_id(),
        exercise: dispatcher.active_kind(),
        positioning_instructions: dispatcher.positioning_instructions().map(str::to_string),
        rep_count: dispatcher.rep_count(),
        pose_state: dispatcher.analyzer_state().map(|s| s.pose_state()),
        detection_quality: dispatcher.detection_quality(),
        last_metrics: last_rep.map(|r| r.metrics),
        last_rep_quality: last_rep.and_then(|r| r.quality),
        frames_analyzed,
        frames_skipped,
        frames_dropped: dropped.load(Ordering::Relaxed),
    }
}
