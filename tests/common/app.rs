use axum::Router;
use tokio::sync::broadcast;

use rep_stream::analysis::DetectorConfig;
use rep_stream::config::{AnalysisEnvConfig, Config, LimitsConfig};
use rep_stream::routes::build_router;
use rep_stream::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
}

pub async fn spawn_with_limits(limits: LimitsConfig) -> TestApp {
    // built directly so tests never race on process-wide env vars
    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        limits,
        analysis: AnalysisEnvConfig::default(),
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(DetectorConfig::default(), &config, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with_limits(LimitsConfig::default()).await
}
