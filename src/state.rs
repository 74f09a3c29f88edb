//! Application configuration
//!
//! Environment-provided settings with fixed local fallbacks

use crate::error::{Error, Result};
use crate::models::Severity;
use crate::pulse_simulator::PulseTiming;
use std::time::Duration;

/// Default HTTP base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
/// Default WebSocket base URL
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";

/// History strip settings
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Number of NOK items requested per refresh
    pub limit: usize,
    /// Poll interval
    pub poll_interval: Duration,
    /// Severity used when the backend does not classify an item
    pub default_severity: Severity,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: 12,
            poll_interval: Duration::from_secs(30),
            default_severity: Severity::High,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend HTTP base URL
    pub api_base_url: String,
    /// Backend WebSocket base URL
    pub ws_base_url: String,
    /// HTTP request timeout
    pub http_timeout: Duration,
    /// Fixed delay before each reconnection attempt
    pub reconnect_delay: Duration,
    /// History strip settings
    pub history: HistoryConfig,
    /// Simulated PLC signal timing
    pub pulse: PulseTiming,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_base_url: DEFAULT_WS_URL.to_string(),
            http_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            history: HistoryConfig::default(),
            pulse: PulseTiming::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (absent keys fall back to defaults)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("API_BASE_URL").filter(|v| !v.is_empty()) {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("WS_URL").filter(|v| !v.is_empty()) {
            config.ws_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(limit) = parse_var::<usize>(&lookup, "HISTORY_LIMIT")? {
            config.history.limit = limit;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "HISTORY_POLL_SECS")? {
            config.history.poll_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "RECONNECT_DELAY_MS")? {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }

        if !config.ws_base_url.starts_with("ws://") && !config.ws_base_url.starts_with("wss://") {
            return Err(Error::Config(format!(
                "WS_URL must use ws:// or wss://, got {}",
                config.ws_base_url
            )));
        }
        if config.history.poll_interval.is_zero() {
            return Err(Error::Config("HISTORY_POLL_SECS must be positive".to_string()));
        }

        Ok(config)
    }

    /// Event stream endpoint
    pub fn events_url(&self) -> String {
        format!("{}/ws/events", self.ws_base_url)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) if !raw.is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has invalid value {:?}", key, raw))),
        _ => Ok(None),
    }
}
