//! ReloadHost use case
//! Drains the host and reloads it in place

use crate::domain::services::{DrainAction, GracefulDrainCoordinator};
use crate::domain::{DomainError, ReloadHostCommand, ReloadHostResponse};
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait ReloadHost: Send + Sync {
    async fn execute(&self, command: ReloadHostCommand) -> Result<ReloadHostResponse, DomainError>;
}

pub struct ReloadHostUseCase {
    coordinator: GracefulDrainCoordinator,
}

impl ReloadHostUseCase {
    pub fn new(coordinator: GracefulDrainCoordinator) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl ReloadHost for ReloadHostUseCase {
    async fn execute(&self, command: ReloadHostCommand) -> Result<ReloadHostResponse, DomainError> {
        info!(
            admin_only = command.admin_only,
            use_current_config = command.use_current_config,
            suspend_timeout_sec = command.suspend_timeout_sec,
            "Reloading host"
        );

        let outcome = self
            .coordinator
            .run(DrainAction::Reload(command.options()), command.suspend_timeout())
            .await;

        Ok(ReloadHostResponse { outcome })
    }
}
