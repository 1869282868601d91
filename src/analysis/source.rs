//! Frame sources.
//!
//! The detector does not care where frames come from: an in-process loop
//! over recorded frames and a channel fed by another task both become a
//! `Stream<Item = SourceItem>` and go through the same dispatcher calls.

use futures::{Stream, StreamExt};

use crate::analysis::analyzer::FrameOutcome;
use crate::analysis::dispatcher::{AnalysisObserver, Dispatcher};
use crate::analysis::exercise::ExerciseKind;
use crate::analysis::types::Frame;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceItem {
    Select(ExerciseKind),
    Frame(Frame),
    Restart,
    Stop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub frames_analyzed: u64,
    pub frames_skipped: u64,
    /// Frames that arrived before any exercise was selected.
    pub frames_ignored: u64,
    pub selections: u32,
}

/// Applies one item to `dispatcher`. Returns `false` once the source asked
/// to stop.
pub fn apply<O: AnalysisObserver>(
    item: SourceItem,
    dispatcher: &mut Dispatcher,
    observer: &mut O,
    stats: &mut PumpStats,
) -> bool {
    match item {
        SourceItem::Select(kind) => {
            dispatcher.select(kind, observer);
            stats.selections += 1;
        }
        SourceItem::Frame(frame) => match dispatcher.dispatch(&frame, observer) {
            Some(FrameOutcome::Analyzed(_)) => stats.frames_analyzed += 1,
            Some(FrameOutcome::Skipped(_)) => stats.frames_skipped += 1,
            None => stats.frames_ignored += 1,
        },
        SourceItem::Restart => {
            dispatcher.restart(observer);
        }
        SourceItem::Stop => return false,
    }
    true
}

/// Drives `dispatcher` until the stream ends or yields `Stop`.
pub async fn pump<S, O>(mut source: S, dispatcher: &mut Dispatcher, observer: &mut O) -> PumpStats
where
    S: Stream<Item = SourceItem> + Unpin,
    O: AnalysisObserver,
{
    let mut stats = PumpStats::default();
    while let Some(item) = source.next().await {
        if !apply(item, dispatcher, observer, &mut stats) {
            break;
        }
    }
    tracing::debug!(
        session_id = %dispatcher.session_id(),
        analyzed = stats.frames_analyzed,
        skipped = stats.frames_skipped,
        "Frame source drained"
    );
    stats
}
