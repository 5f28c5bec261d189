//! ShutdownHost Command

use crate::domain::services::DrainOutcome;
use crate::domain::SuspendTimeout;

/// Command to stop or restart the host process
#[derive(Debug, Clone, Default)]
pub struct ShutdownHostCommand {
    /// Ask the launcher to start the host again
    pub restart: bool,
    /// Seconds to wait for in-flight requests (0 = immediate, negative = no limit)
    pub suspend_timeout_sec: i64,
    /// Restart through the staged installation
    pub perform_installation: bool,
}

impl ShutdownHostCommand {
    pub fn shutdown() -> Self {
        Self::default()
    }

    pub fn restart() -> Self {
        Self {
            restart: true,
            ..Self::default()
        }
    }

    pub fn with_suspend_timeout(mut self, seconds: i64) -> Self {
        self.suspend_timeout_sec = seconds;
        self
    }

    pub fn with_installation(mut self) -> Self {
        self.perform_installation = true;
        self
    }

    pub fn suspend_timeout(&self) -> SuspendTimeout {
        SuspendTimeout::from_seconds(self.suspend_timeout_sec)
    }
}

/// Response from shutting down the host
#[derive(Debug, Clone)]
pub struct ShutdownHostResponse {
    pub outcome: DrainOutcome,
}
