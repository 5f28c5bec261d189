//! RolloutOperation Command

use crate::domain::services::TaskOutcome;
use crate::domain::{OperationResult, RemoteOperation};
use tokio_util::sync::CancellationToken;

/// Command to apply one operation to several servers concurrently
#[derive(Debug, Clone)]
pub struct RolloutOperationCommand {
    /// Target servers; empty means every registered server
    pub servers: Vec<String>,
    pub operation: RemoteOperation,
    /// Cancelling it stops waiting for servers that have not answered yet
    pub interrupt: CancellationToken,
}

impl RolloutOperationCommand {
    pub fn to_all(operation: RemoteOperation) -> Self {
        Self::to_servers(Vec::new(), operation)
    }

    pub fn to_servers(servers: Vec<String>, operation: RemoteOperation) -> Self {
        Self {
            servers,
            operation,
            interrupt: CancellationToken::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }
}

/// Outcome of the operation on one server
#[derive(Debug, Clone)]
pub struct ServerOutcome {
    pub server: String,
    pub outcome: TaskOutcome<OperationResult>,
}

/// Response from a rollout, in target order
#[derive(Debug, Clone)]
pub struct RolloutOperationResponse {
    pub results: Vec<ServerOutcome>,
    /// The rollout stopped waiting early after a failure or interruption
    pub interrupted: bool,
}

impl RolloutOperationResponse {
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome.is_completed())
            .count()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|result| !result.outcome.is_completed())
            .map(|result| result.server.as_str())
            .collect()
    }
}
