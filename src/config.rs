use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub limits: LimitsConfig,
    pub analysis: AnalysisEnvConfig,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_sessions: usize,
    pub frame_queue_capacity: usize,
    pub max_frames_per_batch: usize,
    pub max_sse_connections: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            frame_queue_capacity: 256,
            max_frames_per_batch: 120,
            max_sse_connections: 128,
        }
    }
}

/// Overrides for the detector tunables; `None` keeps the built-in value.
#[derive(Debug, Clone, Default)]
pub struct AnalysisEnvConfig {
    pub exercise_config_path: Option<String>,
    pub debounce_ms: Option<u64>,
    pub guidance_interval_ms: Option<u64>,
    pub entry_confirm_frames: Option<u32>,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = LimitsConfig::default();
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            limits: LimitsConfig {
                max_sessions: env_or_parse("MAX_SESSIONS", defaults.max_sessions).max(1),
                frame_queue_capacity: env_or_parse(
                    "FRAME_QUEUE_CAPACITY",
                    defaults.frame_queue_capacity,
                )
                .max(1),
                max_frames_per_batch: env_or_parse(
                    "MAX_FRAMES_PER_BATCH",
                    defaults.max_frames_per_batch,
                )
                .max(1),
                max_sse_connections: env_or_parse(
                    "MAX_SSE_CONNECTIONS",
                    defaults.max_sse_connections,
                ),
            },
            analysis: AnalysisEnvConfig {
                exercise_config_path: env_opt("EXERCISE_CONFIG_PATH"),
                debounce_ms: env_opt_parse("REP_DEBOUNCE_MS"),
                guidance_interval_ms: env_opt_parse("GUIDANCE_INTERVAL_MS"),
                entry_confirm_frames: env_opt_parse("ENTRY_CONFIRM_FRAMES"),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_opt_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    let raw = env_opt(key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Failed to parse env var, ignoring override");
            None
        }
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
