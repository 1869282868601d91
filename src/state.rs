use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::analysis::config::DetectorConfig;
use crate::config::Config;
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionRegistry>,
    detector: Arc<DetectorConfig>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(detector: DetectorConfig, config: &Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        let detector = Arc::new(detector);
        let sessions = Arc::new(SessionRegistry::new(detector.clone(), config.limits.clone()));
        Self {
            sessions,
            detector,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn detector(&self) -> &DetectorConfig {
        &self.detector
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
