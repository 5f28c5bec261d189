//! ShutdownHost use case
//! Drains the host and exits with the disposition the launcher acts on

use crate::domain::ports::InstallationManager;
use crate::domain::services::{DrainAction, GracefulDrainCoordinator};
use crate::domain::{DomainError, ShutdownHostCommand, ShutdownHostResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait ShutdownHost: Send + Sync {
    async fn execute(&self, command: ShutdownHostCommand)
        -> Result<ShutdownHostResponse, DomainError>;
}

pub struct ShutdownHostUseCase {
    coordinator: GracefulDrainCoordinator,
    installation: Option<Arc<dyn InstallationManager>>,
}

impl ShutdownHostUseCase {
    pub fn new(
        coordinator: GracefulDrainCoordinator,
        installation: Option<Arc<dyn InstallationManager>>,
    ) -> Self {
        Self {
            coordinator,
            installation,
        }
    }
}

#[async_trait]
impl ShutdownHost for ShutdownHostUseCase {
    async fn execute(
        &self,
        command: ShutdownHostCommand,
    ) -> Result<ShutdownHostResponse, DomainError> {
        if command.perform_installation {
            let pending = self
                .installation
                .as_ref()
                .is_some_and(|installation| installation.installation_pending());
            if !pending {
                return Err(DomainError::InvalidCommand(
                    "no installation is pending".to_string(),
                ));
            }
        }

        info!(
            restart = command.restart,
            perform_installation = command.perform_installation,
            suspend_timeout_sec = command.suspend_timeout_sec,
            "Shutting down host"
        );

        let action = DrainAction::Shutdown {
            restart: command.restart || command.perform_installation,
            perform_installation: command.perform_installation,
        };
        let outcome = self
            .coordinator
            .run(action, command.suspend_timeout())
            .await;

        Ok(ShutdownHostResponse { outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockActionPerformer, MockInstallationManager, MockSuspendController};
    use crate::domain::services::{DrainOutcome, DrainTrigger, ProcessStateMachine};
    use crate::domain::ExitDisposition;

    fn use_case(
        installation: Option<Arc<dyn InstallationManager>>,
    ) -> (ShutdownHostUseCase, Arc<MockActionPerformer>) {
        let process = Arc::new(ProcessStateMachine::new("host", true));
        process.set_running();
        let performer = Arc::new(MockActionPerformer::new());
        let mut coordinator = GracefulDrainCoordinator::new(
            process,
            Arc::new(MockSuspendController::already_suspended()),
            performer.clone(),
        );
        if let Some(installation) = &installation {
            coordinator = coordinator.with_installation(installation.clone());
        }
        (ShutdownHostUseCase::new(coordinator, installation), performer)
    }

    #[tokio::test]
    async fn test_plain_shutdown() {
        let (use_case, performer) = use_case(None);

        let response = use_case
            .execute(ShutdownHostCommand::shutdown())
            .await
            .unwrap();

        assert_eq!(
            response.outcome,
            DrainOutcome::Performed {
                trigger: DrainTrigger::AlreadySuspended,
                disposition: Some(ExitDisposition::Normal)
            }
        );
        assert_eq!(performer.exits(), vec![ExitDisposition::Normal]);
    }

    #[tokio::test]
    async fn test_installation_requires_pending_installation() {
        let (use_case, performer) =
            use_case(Some(Arc::new(MockInstallationManager::none_pending())));

        let result = use_case
            .execute(ShutdownHostCommand::restart().with_installation())
            .await;

        assert!(matches!(result, Err(DomainError::InvalidCommand(_))));
        assert!(performer.exits().is_empty());
    }

    #[tokio::test]
    async fn test_installation_without_manager_rejected() {
        let (use_case, _) = use_case(None);
        let result = use_case
            .execute(ShutdownHostCommand::shutdown().with_installation())
            .await;
        assert!(matches!(result, Err(DomainError::InvalidCommand(_))));
    }

    #[tokio::test]
    async fn test_restart_with_pending_installation() {
        let (use_case, performer) = use_case(Some(Arc::new(MockInstallationManager::pending())));

        use_case
            .execute(ShutdownHostCommand::shutdown().with_installation())
            .await
            .unwrap();

        assert_eq!(
            performer.exits(),
            vec![ExitDisposition::RestartWithPendingInstallation]
        );
    }
}
