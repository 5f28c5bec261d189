//! Daemon configuration from environment variables
//!
//! All configuration is read from environment variables with sensible defaults.
//! This eliminates the need for command-line argument parsing.

use dc_engine::constants::daemon::DEFAULT_LOG_LEVEL;
use dc_engine::constants::drain::DEFAULT_SUSPEND_TIMEOUT_SEC;
use std::env;

/// Daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Host config file path
    pub host_config: Option<String>,

    /// Directory with one YAML file per managed server
    pub servers_dir: Option<String>,

    /// Log level
    pub log_level: String,

    /// Suspend timeout for signal-triggered shutdowns (seconds, 0 = immediate,
    /// negative = wait for every in-flight request)
    pub suspend_timeout_sec: i64,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host_config: env::var("DC_HOST_CONFIG").ok(),
            servers_dir: env::var("DC_SERVERS_DIR").ok(),
            log_level: Self::parse_log_level(),
            suspend_timeout_sec: Self::parse_i64("DC_SUSPEND_TIMEOUT_SEC")
                .unwrap_or(DEFAULT_SUSPEND_TIMEOUT_SEC),
        }
    }

    fn parse_i64(var_name: &str) -> Option<i64> {
        env::var(var_name).ok().and_then(|s| s.trim().parse().ok())
    }

    fn parse_log_level() -> String {
        // Priority: DC_LOG_LEVEL > RUST_LOG > default
        env::var("DC_LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(dir) = &self.servers_dir {
            if dir.trim().is_empty() {
                return Err("DC_SERVERS_DIR cannot be empty".to_string());
            }
        }
        if let Some(file) = &self.host_config {
            if file.trim().is_empty() {
                return Err("DC_HOST_CONFIG cannot be empty".to_string());
            }
        }
        Ok(())
    }
}
