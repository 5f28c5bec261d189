//! Remote operation value objects
//! Units of work dispatched to a subordinate server through its proxy

use crate::domain::value_objects::{DisplayState, Stamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an operation asks the subordinate server to do
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Raise the server's restart-required flag
    MarkRestartRequired,

    /// Raise the server's reload-required flag
    MarkReloadRequired,

    /// Read the server's display state
    ReadState,

    /// Reload the server in place
    Reload,

    /// Any other management operation, identified by name
    Named(String),
}

impl OperationKind {
    /// Administrative operations that are still honored against the local
    /// mirror of a server while its transport is disconnected.
    pub fn is_honored_while_disconnected(&self) -> bool {
        matches!(
            self,
            OperationKind::MarkRestartRequired
                | OperationKind::MarkReloadRequired
                | OperationKind::ReadState
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::MarkRestartRequired => write!(f, "mark-restart-required"),
            OperationKind::MarkReloadRequired => write!(f, "mark-reload-required"),
            OperationKind::ReadState => write!(f, "read-state"),
            OperationKind::Reload => write!(f, "reload"),
            OperationKind::Named(name) => write!(f, "{}", name),
        }
    }
}

/// An operation addressed to one subordinate server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOperation {
    pub kind: OperationKind,

    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RemoteOperation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            payload: serde_json::Value::Null,
        }
    }

    /// Named operation with an arbitrary payload
    pub fn named(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: OperationKind::Named(name.into()),
            payload,
        }
    }

    pub fn mark_restart_required() -> Self {
        Self::new(OperationKind::MarkRestartRequired)
    }

    pub fn mark_reload_required() -> Self {
        Self::new(OperationKind::MarkReloadRequired)
    }

    pub fn read_state() -> Self {
        Self::new(OperationKind::ReadState)
    }
}

/// Successful result of a remote operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationResult {
    /// A sticky requirement was raised; the stamp allows reverting it
    RequirementRaised(Stamp),

    /// Current display state of the server
    State(DisplayState),

    /// Generic result payload
    Success(serde_json::Value),
}
