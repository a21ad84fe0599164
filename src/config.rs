use std::env;
use std::str::FromStr;

use crate::metrics::ProcessorConfig;

/// Process configuration, read once at startup from the environment.
/// Unset or unparseable variables fall back to the defaults below.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port (`PORT`)
    pub port: u16,
    /// Log filter, e.g. "info" or "debug" (`LOG_LEVEL`)
    pub log_level: String,
    /// Anomaly threshold for a single request (`ALERT_THRESHOLD_MS`)
    pub alert_threshold_ms: u64,
    /// Latency samples retained per endpoint (`SAMPLE_WINDOW_CAPACITY`)
    pub window_capacity: usize,
    /// Whether the default log-alert subscriber is wired (`ENABLE_ALERTS`)
    pub enable_alerts: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 8080),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            alert_threshold_ms: env_or("ALERT_THRESHOLD_MS", 5000),
            window_capacity: env_or("SAMPLE_WINDOW_CAPACITY", 1000),
            enable_alerts: env_or("ENABLE_ALERTS", true),
        }
    }

    /// The slice of configuration the aggregation core consumes.
    pub fn processor(&self) -> ProcessorConfig {
        ProcessorConfig {
            alert_threshold_ms: self.alert_threshold_ms,
            window_capacity: self.window_capacity,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
