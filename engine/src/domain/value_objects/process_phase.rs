//! ProcessPhase and DisplayState value objects
//! The directly controlled lifecycle phase of a managed process and the
//! externally visible state derived from it

use serde::{Deserialize, Serialize};
use std::fmt;

/// The transient lifecycle phase of a process, set directly by its controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessPhase {
    /// Process is booting
    #[default]
    Starting,

    /// Process is up and serving
    Running,

    /// Process is tearing down its services
    Stopping,

    /// Process has been stopped
    Stopped,
}

impl ProcessPhase {
    /// Check if the process is in the running phase
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessPhase::Running)
    }

    /// Check if the process is on its way down or already down
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, ProcessPhase::Stopping | ProcessPhase::Stopped)
    }
}

impl fmt::Display for ProcessPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessPhase::Starting => write!(f, "starting"),
            ProcessPhase::Running => write!(f, "running"),
            ProcessPhase::Stopping => write!(f, "stopping"),
            ProcessPhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// A sticky requirement that survives phase transitions until reverted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Requirement {
    /// The process must be fully restarted for pending changes to apply
    Restart,

    /// Reloading the process is enough for pending changes to apply
    Reload,
}

impl Requirement {
    /// Requirements ordered from strongest to weakest; the first active one
    /// decides the displayed state.
    pub const PRECEDENCE: [Requirement; 2] = [Requirement::Restart, Requirement::Reload];

    /// Display state shown while this requirement is the strongest active one
    pub fn display_state(&self) -> DisplayState {
        match self {
            Requirement::Restart => DisplayState::RestartRequired,
            Requirement::Reload => DisplayState::ReloadRequired,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Restart => write!(f, "restart"),
            Requirement::Reload => write!(f, "reload"),
        }
    }
}

/// The externally visible state of a process
///
/// Never stored: always derived from the phase and the sticky requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayState {
    Starting,
    Running,
    RestartRequired,
    ReloadRequired,
    Stopping,
    Stopped,
}

impl DisplayState {
    /// Derive the display state from a phase and the strongest active requirement
    pub fn derive(phase: ProcessPhase, strongest: Option<Requirement>) -> Self {
        match phase {
            ProcessPhase::Starting => DisplayState::Starting,
            ProcessPhase::Stopping => DisplayState::Stopping,
            ProcessPhase::Stopped => DisplayState::Stopped,
            ProcessPhase::Running => strongest
                .map(|requirement| requirement.display_state())
                .unwrap_or(DisplayState::Running),
        }
    }

    /// Whether the process is serving, with or without a pending requirement
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            DisplayState::Running | DisplayState::RestartRequired | DisplayState::ReloadRequired
        )
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayState::Starting => write!(f, "starting"),
            DisplayState::Running => write!(f, "running"),
            DisplayState::RestartRequired => write!(f, "restart-required"),
            DisplayState::ReloadRequired => write!(f, "reload-required"),
            DisplayState::Stopping => write!(f, "stopping"),
            DisplayState::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_running_phase_hides_requirements() {
        for phase in [
            ProcessPhase::Starting,
            ProcessPhase::Stopping,
            ProcessPhase::Stopped,
        ] {
            let derived = DisplayState::derive(phase, Some(Requirement::Restart));
            assert!(!derived.is_running());
            assert_eq!(derived.to_string(), phase.to_string());
        }
    }

    #[test]
    fn test_running_phase_shows_strongest_requirement() {
        assert_eq!(
            DisplayState::derive(ProcessPhase::Running, None),
            DisplayState::Running
        );
        assert_eq!(
            DisplayState::derive(ProcessPhase::Running, Some(Requirement::Reload)),
            DisplayState::ReloadRequired
        );
        assert_eq!(
            DisplayState::derive(ProcessPhase::Running, Some(Requirement::Restart)),
            DisplayState::RestartRequired
        );
    }

    #[test]
    fn test_precedence_puts_restart_first() {
        assert_eq!(Requirement::PRECEDENCE[0], Requirement::Restart);
    }

    #[test]
    fn test_display() {
        assert_eq!(DisplayState::RestartRequired.to_string(), "restart-required");
        assert_eq!(ProcessPhase::Stopping.to_string(), "stopping");
    }

    #[test]
    fn test_default() {
        assert_eq!(ProcessPhase::default(), ProcessPhase::Starting);
    }
}
