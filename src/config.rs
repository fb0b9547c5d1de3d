// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Configuration
 * Polling cadences and application environment settings
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use std::time::Duration;

use crate::monitor::MonitorConfig;

/// Orchestrator timing. The session-state poll is intentionally decoupled
/// from the job monitors so pause/cancel requests are observed promptly
/// while a tool job is mid-flight.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cadence for re-reading pause/cancel flags while a run is active
    pub session_poll_interval: Duration,

    /// Settle delay between stage completions
    pub stage_settle_delay: Duration,

    /// Per-job polling behavior
    pub monitor: MonitorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_poll_interval: Duration::from_secs(2),
            stage_settle_delay: Duration::from_secs(1),
            monitor: MonitorConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_session_poll_interval(mut self, interval: Duration) -> Self {
        self.session_poll_interval = interval;
        self
    }

    pub fn with_stage_settle_delay(mut self, delay: Duration) -> Self {
        self.stage_settle_delay = delay;
        self
    }

    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }
}

/// Application configuration for the binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection URL; in-memory store when unset
    pub database_url: Option<String>,
    pub pool_size: usize,
    /// Base URL of the tool-service gateway
    pub tool_service_url: String,
    pub tool_timeout_secs: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            pool_size: 20,
            tool_service_url: "http://localhost:8443".to_string(),
            tool_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults
    ///
    /// Supports the following environment variables:
    /// - DATABASE_URL: PostgreSQL connection URL (enables the durable store)
    /// - POOL_SIZE: connection pool size
    /// - TOOL_SERVICE_URL: base URL of the tool-service gateway
    /// - TOOL_TIMEOUT: per-request tool service timeout in seconds
    /// - LOG_LEVEL: logging level
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(db_url);
        }

        if let Ok(pool_size) = std::env::var("POOL_SIZE") {
            config.pool_size = pool_size
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid POOL_SIZE value"))?;
        }

        if let Ok(url) = std::env::var("TOOL_SERVICE_URL") {
            config.tool_service_url = url;
        }

        if let Ok(timeout) = std::env::var("TOOL_TIMEOUT") {
            config.tool_timeout_secs = timeout
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid TOOL_TIMEOUT value"))?;
        }

        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.session_poll_interval, Duration::from_secs(2));
        assert_eq!(config.monitor.max_attempts, 600);
    }

    #[test]
    fn test_engine_config_builders() {
        let config = EngineConfig::default()
            .with_session_poll_interval(Duration::from_millis(10))
            .with_stage_settle_delay(Duration::from_millis(0));
        assert_eq!(config.session_poll_interval, Duration::from_millis(10));
        assert_eq!(config.stage_settle_delay, Duration::from_millis(0));
    }
}
