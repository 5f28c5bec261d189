//! Application-wide constants and default values
//!
//! Centralizes magic numbers and default configurations for better maintainability

/// Exit codes understood by the external process launcher
pub mod exit_codes {
    /// Plain exit, the launcher does not restart the process
    pub const EXIT_CODE_NORMAL: i32 = 0;

    /// The launcher starts the process again
    pub const EXIT_CODE_RESTART_FROM_LAUNCHER: i32 = 10;

    /// The launcher applies the staged installation, then restarts
    pub const EXIT_CODE_PERFORM_INSTALLATION: i32 = 14;
}

/// Graceful drain defaults
pub mod drain {
    /// How long a shutdown waits for the companion client to release the
    /// installation lock (seconds)
    pub const DEFAULT_INSTALLATION_LOCK_TIMEOUT_SEC: u64 = 180;

    /// Suspend timeout used for signal-triggered shutdowns (seconds, 0 = immediate)
    pub const DEFAULT_SUSPEND_TIMEOUT_SEC: i64 = 0;

    /// Poll interval while waiting for the installation lock file to disappear
    pub const INSTALLATION_LOCK_POLL_MS: u64 = 250;
}

/// Installation directory layout
pub mod installation {
    /// Marker file whose presence means an installation is staged
    pub const PENDING_MARKER: &str = "pending";

    /// Lock file held by the companion client process
    pub const CLIENT_LOCK: &str = "client.lock";
}

/// Daemon defaults
pub mod daemon {
    /// Host name used when the configuration does not name one
    pub const DEFAULT_HOST_NAME: &str = "host";

    /// Default log filter
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}
