//! Configuration loading from YAML files
//!
//! The host is described by one YAML file. Managed servers live in a
//! directory with one YAML file per server, the server name derived from the
//! filename.

use crate::constants::daemon::DEFAULT_HOST_NAME;
use crate::constants::drain::DEFAULT_INSTALLATION_LOCK_TIMEOUT_SEC;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host_name")]
    pub name: String,

    #[serde(default = "default_true")]
    pub reload_capable: bool,

    #[serde(default)]
    pub installation: Option<InstallationConfig>,
}

/// Where staged installations are kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationConfig {
    pub dir: PathBuf,

    #[serde(default = "default_lock_timeout_sec")]
    pub lock_timeout_sec: u64,
}

impl InstallationConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_sec)
    }
}

/// Managed server configuration from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub reload_capable: bool,

    /// Connect the server's transport at registration
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Artificial latency of the loopback transport (milliseconds)
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_host_name(),
            reload_capable: true,
            installation: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            reload_capable: true,
            auto_start: true,
            latency_ms: 0,
        }
    }
}

fn default_host_name() -> String {
    DEFAULT_HOST_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_lock_timeout_sec() -> u64 {
    DEFAULT_INSTALLATION_LOCK_TIMEOUT_SEC
}

impl Config {
    /// Load host configuration from a YAML file
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML from '{}': {}", path, e))?;

        if config.name.trim().is_empty() {
            return Err(format!("Host name cannot be empty in '{}'", path));
        }
        Ok(config)
    }
}

/// Load managed servers from a configuration directory
///
/// Each YAML file in the directory represents one server, named after the
/// file without its extension. Files that fail to load are skipped with a
/// warning. Servers are returned sorted by filename.
///
/// # Example
/// ```text
/// /etc/drain-control/servers.d/
/// ├── app-1.yaml      # Server name: "app-1"
/// └── batch.yaml      # Server name: "batch"
/// ```
pub fn load_servers_from_dir(config_dir: &str) -> Result<Vec<(String, ServerConfig)>, String> {
    let path = Path::new(config_dir);
    if !path.is_dir() {
        return Err(format!(
            "Configuration directory does not exist: {}",
            config_dir
        ));
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| format!("Failed to read config directory '{}': {}", config_dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && (path.extension() == Some(OsStr::new("yaml"))
                    || path.extension() == Some(OsStr::new("yml")))
        })
        .collect();

    // Sort by filename for deterministic load order
    entries.sort();

    let mut servers = Vec::with_capacity(entries.len());
    for path in entries {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = ?path, "Invalid UTF-8 in file name, skipping");
            continue;
        };

        match load_server_file(&path) {
            Ok(config) => servers.push((name.to_string(), config)),
            Err(e) => warn!(path = ?path, error = %e, "Failed to load server config, skipping"),
        }
    }

    Ok(servers)
}

fn load_server_file(path: &Path) -> Result<ServerConfig, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;

    // An empty file means every default
    if contents.trim().is_empty() {
        return Ok(ServerConfig::default());
    }

    serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse YAML from '{}': {}", path.display(), e))
}
