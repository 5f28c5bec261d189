//! Domain-level errors
//! These represent failures scoped to the call that triggered them; stale
//! tokens and redundant disconnects are not errors and never show up here

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // Server registry errors
    #[error("Server '{0}' not found")]
    ServerNotFound(String),

    #[error("Server '{0}' already exists")]
    DuplicateServer(String),

    // Remote dispatch errors
    #[error("Channel to server '{0}' is closed")]
    ChannelClosed(String),

    #[error("Operation was cancelled")]
    OperationCancelled,

    #[error("Remote operation failed: {0}")]
    OperationFailed(String),

    // Fan-out errors
    #[error("Task '{0}' panicked")]
    TaskPanicked(String),

    // Validation errors
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // Disruptive action errors
    #[error("Reload failed: {0}")]
    ReloadFailed(String),

    #[error("Installation lock: {0}")]
    InstallationLock(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
