use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::analysis::config::DetectorConfig;
use crate::analysis::dispatcher::SessionSummary;
use crate::analysis::exercise::ExerciseKind;
use crate::config::LimitsConfig;
use crate::session::actor::{self, SessionHandle};
use crate::session::SessionError;

struct SessionEntry {
    handle: SessionHandle,
    task: JoinHandle<SessionSummary>,
}

/// Live sessions by id.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    detector: Arc<DetectorConfig>,
    limits: LimitsConfig,
}

impl SessionRegistry {
    pub fn new(detector: Arc<DetectorConfig>, limits: LimitsConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            detector,
            limits,
        }
    }

    pub fn detector(&self) -> &DetectorConfig {
        &self.detector
    }

    pub async fn create(&self, exercise: ExerciseKind) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.limits.max_sessions {
            return Err(SessionError::LimitReached(self.limits.max_sessions));
        }
        let (handle, task) = actor::spawn(
            self.detector.clone(),
            exercise,
            self.limits.frame_queue_capacity,
        );
        sessions.insert(
            handle.id(),
            SessionEntry {
                handle: handle.clone(),
                task,
            },
        );
        Ok(handle)
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|entry| entry.handle.clone())
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stops the session and waits for its summary.
    pub async fn finish(&self, id: Uuid) -> Result<SessionSummary, SessionError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        Self::stop_entry(entry).await
    }

    /// Stops every session; used on server shutdown.
    pub async fn shutdown(&self) -> Vec<SessionSummary> {
        let entries: Vec<SessionEntry> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry)
            .collect();

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            match Self::stop_entry(entry).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => tracing::warn!(error = %e, "Session did not stop cleanly"),
            }
        }
        summaries
    }

    async fn stop_entry(entry: SessionEntry) -> Result<SessionSummary, SessionError> {
        let id = entry.handle.id();
        if entry.handle.stop().await.is_err() {
            tracing::debug!(session_id = %id, "Session task already gone");
        }
        drop(entry.handle);
        entry.task.await.map_err(|e| {
            tracing::error!(session_id = %id, error = %e, "Session task failed");
            SessionError::Closed(id)
        })
    }
}
