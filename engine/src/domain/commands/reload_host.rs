//! ReloadHost Command

use crate::domain::ports::ReloadOptions;
use crate::domain::services::DrainOutcome;
use crate::domain::SuspendTimeout;

/// Command to reload the host in place
#[derive(Debug, Clone, Default)]
pub struct ReloadHostCommand {
    pub admin_only: bool,
    pub use_current_config: bool,
    /// Seconds to wait for in-flight requests (0 = immediate, negative = no limit)
    pub suspend_timeout_sec: i64,
}

impl ReloadHostCommand {
    pub fn options(&self) -> ReloadOptions {
        ReloadOptions {
            admin_only: self.admin_only,
            use_current_config: self.use_current_config,
        }
    }

    pub fn suspend_timeout(&self) -> SuspendTimeout {
        SuspendTimeout::from_seconds(self.suspend_timeout_sec)
    }
}

/// Response from reloading the host
#[derive(Debug, Clone)]
pub struct ReloadHostResponse {
    pub outcome: DrainOutcome,
}
