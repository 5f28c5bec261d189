//! RolloutOperation use case
//! Applies one remote operation to many servers at once

use crate::domain::ports::ServerRepository;
use crate::domain::services::{ConcurrentBatch, ConcurrentFanoutExecutor};
use crate::domain::{
    DomainError, OperationResult, RolloutOperationCommand, RolloutOperationResponse, ServerOutcome,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait RolloutOperation: Send + Sync {
    async fn execute(
        &self,
        command: RolloutOperationCommand,
    ) -> Result<RolloutOperationResponse, DomainError>;
}

pub struct RolloutOperationUseCase {
    repository: Arc<dyn ServerRepository>,
    executor: Arc<ConcurrentFanoutExecutor>,
}

impl RolloutOperationUseCase {
    pub fn new(
        repository: Arc<dyn ServerRepository>,
        executor: Arc<ConcurrentFanoutExecutor>,
    ) -> Self {
        Self {
            repository,
            executor,
        }
    }
}

#[async_trait]
impl RolloutOperation for RolloutOperationUseCase {
    async fn execute(
        &self,
        command: RolloutOperationCommand,
    ) -> Result<RolloutOperationResponse, DomainError> {
        // Resolve every target before dispatching anything
        let servers = if command.servers.is_empty() {
            self.repository.find_all().await?
        } else {
            let mut servers = Vec::with_capacity(command.servers.len());
            for name in &command.servers {
                servers.push(self.repository.get(name).await?);
            }
            servers
        };

        let mut batch = ConcurrentBatch::<OperationResult>::new();
        for server in &servers {
            let server = server.clone();
            let operation = command.operation.clone();
            batch.push(server.name().to_string(), async move {
                server.execute(operation)?.await
            });
        }

        info!(
            operation = %command.operation.kind,
            servers = batch.len(),
            "Rolling out operation"
        );
        let report = self.executor.run(batch, &command.interrupt).await;

        let response = RolloutOperationResponse {
            results: report
                .tasks
                .into_iter()
                .map(|task| ServerOutcome {
                    server: task.name,
                    outcome: task.outcome,
                })
                .collect(),
            interrupted: report.interrupted,
        };

        if response.interrupted {
            warn!(
                operation = %command.operation.kind,
                failed = ?response.failed(),
                "Rollout did not complete on every server"
            );
        } else {
            info!(
                operation = %command.operation.kind,
                succeeded = response.succeeded(),
                "Rollout completed"
            );
        }

        Ok(response)
    }
}
