use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::analysis::feedback::Feedback;
use crate::extractors::SessionId;
use crate::response::AppError;
use crate::session::SessionEvent;
use crate::state::AppState;

static SSE_CONNECTION_COUNT: AtomicUsize = AtomicUsize::new(0);

struct SseGuard;
impl Drop for SseGuard {
    fn drop(&mut self) {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/events", get(session_events))
}

/// Streams a session's events until the session ends or the server shuts
/// down. The first event repeats the active exercise's positioning
/// instructions, which were published before anyone could subscribe.
pub async fn session_events(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let handle = state.sessions().get(id).await?;

    let max_sse = state.config().limits.max_sse_connections;
    let current = SSE_CONNECTION_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= max_sse {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests(
            "SSE_LIMIT",
            "Too many SSE connections",
        ));
    }
    let guard = SseGuard;

    let mut events = handle.subscribe();
    let mut snapshot = handle.watch_snapshot();
    let mut shutdown_rx = state.shutdown_rx();
    let instructions = handle.snapshot().positioning_instructions;
    drop(handle);

    let stream = async_stream::stream! {
        let _guard = guard;
        if let Some(text) = instructions {
            let event = SessionEvent::Feedback(Feedback::event(text));
            if let Ok(json) = serde_json::to_string(&event) {
                yield Ok(Event::default().event(event.name()).data(json));
            }
        }
        loop {
            tokio::select! {
                // drain pending events before noticing the session ended
                biased;
                received = events.recv() => match received {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => yield Ok(Event::default().event(event.name()).data(json)),
                        Err(e) => tracing::warn!(session_id = %id, error = %e, "Failed to encode session event"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(session_id = %id, skipped, "SSE subscriber lagging, events skipped");
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = snapshot.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
        tracing::debug!(session_id = %id, "SSE stream closed");
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
