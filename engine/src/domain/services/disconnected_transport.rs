//! Sentinel transport attached while a server has no live connection
//!
//! Administrative operations are applied to the local mirror of the server's
//! state so they take effect once the server reconnects. Everything else is
//! rejected with a closed channel.

use crate::domain::ports::{OperationFuture, Transport};
use crate::domain::services::ProcessStateMachine;
use crate::domain::{DomainError, OperationKind, OperationResult, RemoteOperation, TransportId};
use std::sync::Arc;
use tracing::debug;

/// Apply an administrative operation to a state machine
///
/// Returns `None` for operations that need a live server.
pub fn apply_administrative(
    machine: &ProcessStateMachine,
    operation: &RemoteOperation,
) -> Option<OperationResult> {
    if !operation.kind.is_honored_while_disconnected() {
        return None;
    }

    let result = match operation.kind {
        OperationKind::MarkRestartRequired => {
            OperationResult::RequirementRaised(machine.set_restart_required())
        }
        OperationKind::MarkReloadRequired => {
            OperationResult::RequirementRaised(machine.set_reload_required())
        }
        _ => OperationResult::State(machine.get_state()),
    };
    Some(result)
}

pub struct DisconnectedTransport {
    server: String,
    mirror: Arc<ProcessStateMachine>,
}

impl DisconnectedTransport {
    pub fn new(server: impl Into<String>, mirror: Arc<ProcessStateMachine>) -> Self {
        Self {
            server: server.into(),
            mirror,
        }
    }
}

impl Transport for DisconnectedTransport {
    fn id(&self) -> TransportId {
        TransportId::disconnected()
    }

    fn dispatch(&self, operation: RemoteOperation) -> Result<OperationFuture, DomainError> {
        match apply_administrative(&self.mirror, &operation) {
            Some(result) => {
                debug!(
                    server = %self.server,
                    operation = %operation.kind,
                    "Applied operation to local mirror while disconnected"
                );
                Ok(Box::pin(async move { Ok(result) }))
            }
            None => Err(DomainError::ChannelClosed(self.server.clone())),
        }
    }
}
