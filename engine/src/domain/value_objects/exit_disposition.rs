//! ExitDisposition value object
//! How a stopping process tells its launcher what to do next

use crate::constants::exit_codes::{
    EXIT_CODE_NORMAL, EXIT_CODE_PERFORM_INSTALLATION, EXIT_CODE_RESTART_FROM_LAUNCHER,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final disposition communicated to the external process launcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitDisposition {
    /// Stop and stay stopped
    Normal,

    /// Launcher should start the process again
    RestartFromLauncher,

    /// Launcher should apply the prepared installation, then start the process again
    RestartWithPendingInstallation,
}

impl ExitDisposition {
    /// Process exit code the launcher script interprets
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitDisposition::Normal => EXIT_CODE_NORMAL,
            ExitDisposition::RestartFromLauncher => EXIT_CODE_RESTART_FROM_LAUNCHER,
            ExitDisposition::RestartWithPendingInstallation => EXIT_CODE_PERFORM_INSTALLATION,
        }
    }

    pub fn is_restart(&self) -> bool {
        !matches!(self, ExitDisposition::Normal)
    }
}

impl fmt::Display for ExitDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitDisposition::Normal => write!(f, "normal"),
            ExitDisposition::RestartFromLauncher => write!(f, "restart"),
            ExitDisposition::RestartWithPendingInstallation => {
                write!(f, "restart-with-installation")
            }
        }
    }
}
