//! Loopback Transport
//! In-process Transport adapter that applies operations to a local state machine

use crate::domain::ports::{OperationFuture, Transport};
use crate::domain::services::{apply_administrative, ProcessStateMachine};
use crate::domain::{DomainError, OperationKind, OperationResult, RemoteOperation, TransportId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Transport reaching a server that runs in the same process
///
/// Every operation completes after `latency`. `Reload` cycles the target
/// through stopping, starting and running; named operations echo their
/// payload back.
pub struct LoopbackTransport {
    id: TransportId,
    target: Arc<ProcessStateMachine>,
    latency: Duration,
}

impl LoopbackTransport {
    pub fn new(target: Arc<ProcessStateMachine>) -> Self {
        Self {
            id: TransportId::generate(),
            target,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn target(&self) -> &Arc<ProcessStateMachine> {
        &self.target
    }
}

impl Transport for LoopbackTransport {
    fn id(&self) -> TransportId {
        self.id
    }

    fn dispatch(&self, operation: RemoteOperation) -> Result<OperationFuture, DomainError> {
        let target = Arc::clone(&self.target);
        let latency = self.latency;
        let transport = self.id;

        Ok(Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            debug!(
                transport = %transport,
                server = %target.name(),
                operation = %operation.kind,
                "Applying operation over loopback"
            );

            if let Some(result) = apply_administrative(&target, &operation) {
                return Ok(result);
            }
            match operation.kind {
                OperationKind::Reload => {
                    target.set_stopping();
                    target.set_starting();
                    target.set_running();
                    Ok(OperationResult::State(target.get_state()))
                }
                _ => Ok(OperationResult::Success(operation.payload)),
            }
        }))
    }
}
