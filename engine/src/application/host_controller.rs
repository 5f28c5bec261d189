//! Host Controller
//! Central composition root for the host and its managed servers

use crate::domain::ports::{
    ActionPerformer, InstallationManager, ServerRepository, SuspendController, Transport,
};
use crate::domain::services::{
    ConcurrentFanoutExecutor, ConsoleAvailability, GracefulDrainCoordinator, ProcessStateMachine,
};
use crate::domain::use_cases::{
    ReloadHost, ReloadHostUseCase, RolloutOperation, RolloutOperationUseCase, ShutdownHost,
    ShutdownHostUseCase,
};
use crate::domain::{
    DomainError, ManagedServer, ReloadHostCommand, ReloadHostResponse, RolloutOperationCommand,
    RolloutOperationResponse, ShutdownHostCommand, ShutdownHostResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Collaborators the host controller is assembled from
pub struct HostComponents {
    pub host: Arc<ProcessStateMachine>,
    pub suspend: Arc<dyn SuspendController>,
    pub performer: Arc<dyn ActionPerformer>,
    pub repository: Arc<dyn ServerRepository>,
    pub installation: Option<Arc<dyn InstallationManager>>,
    pub installation_lock_timeout: Option<Duration>,
}

/// Composition root wiring the drain and rollout use cases together
pub struct HostController {
    host: Arc<ProcessStateMachine>,
    repository: Arc<dyn ServerRepository>,
    console: Arc<ConsoleAvailability>,

    shutdown_host: Arc<dyn ShutdownHost>,
    reload_host: Arc<dyn ReloadHost>,
    rollout_operation: Arc<dyn RolloutOperation>,
}

impl HostController {
    /// Wire up the controller
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; the fan-out executor binds
    /// to the current runtime.
    pub fn new(components: HostComponents) -> Self {
        let HostComponents {
            host,
            suspend,
            performer,
            repository,
            installation,
            installation_lock_timeout,
        } = components;

        let mut coordinator = GracefulDrainCoordinator::new(host.clone(), suspend, performer);
        if let Some(installation) = &installation {
            coordinator = coordinator.with_installation(installation.clone());
        }
        if let Some(timeout) = installation_lock_timeout {
            coordinator = coordinator.with_installation_lock_timeout(timeout);
        }

        let executor = Arc::new(ConcurrentFanoutExecutor::current());
        let console = ConsoleAvailability::attach(&host);

        Self {
            shutdown_host: Arc::new(ShutdownHostUseCase::new(coordinator.clone(), installation)),
            reload_host: Arc::new(ReloadHostUseCase::new(coordinator)),
            rollout_operation: Arc::new(RolloutOperationUseCase::new(
                repository.clone(),
                executor,
            )),
            host,
            repository,
            console,
        }
    }

    pub fn host(&self) -> &Arc<ProcessStateMachine> {
        &self.host
    }

    /// Whether the administrative console may be offered
    pub fn console_available(&self) -> bool {
        self.console.is_available()
    }

    /// Register a new managed server; it starts disconnected
    pub async fn register_server(
        &self,
        name: &str,
        reload_capable: bool,
    ) -> Result<Arc<ManagedServer>, DomainError> {
        let server = Arc::new(ManagedServer::new(name, reload_capable)?);
        self.repository.create(server.clone()).await?;
        info!(server = %name, reload_capable, "Server registered");
        Ok(server)
    }

    pub async fn unregister_server(&self, name: &str) -> Result<(), DomainError> {
        self.repository.get(name).await?;
        self.repository.delete(name).await
    }

    pub async fn server(&self, name: &str) -> Result<Arc<ManagedServer>, DomainError> {
        self.repository.get(name).await
    }

    pub async fn servers(&self) -> Result<Vec<Arc<ManagedServer>>, DomainError> {
        self.repository.find_all().await
    }

    /// Attach a live transport to a registered server
    pub async fn connect_server(
        &self,
        name: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<(), DomainError> {
        let server = self.repository.get(name).await?;
        server.proxy().connected(transport);
        Ok(())
    }

    /// Report that `transport` of a server went away
    ///
    /// Returns false when the transport had already been replaced.
    pub async fn disconnect_server(
        &self,
        name: &str,
        transport: &dyn Transport,
    ) -> Result<bool, DomainError> {
        let server = self.repository.get(name).await?;
        Ok(server.proxy().disconnected(transport))
    }

    pub async fn shutdown(
        &self,
        command: ShutdownHostCommand,
    ) -> Result<ShutdownHostResponse, DomainError> {
        self.shutdown_host.execute(command).await
    }

    pub async fn reload(
        &self,
        command: ReloadHostCommand,
    ) -> Result<ReloadHostResponse, DomainError> {
        self.reload_host.execute(command).await
    }

    pub async fn rollout(
        &self,
        command: RolloutOperationCommand,
    ) -> Result<RolloutOperationResponse, DomainError> {
        self.rollout_operation.execute(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockActionPerformer, MockSuspendController};
    use crate::domain::services::DrainOutcome;
    use crate::domain::ExitDisposition;
    use crate::infrastructure::{InMemoryServerRepository, LoopbackTransport};

    fn controller() -> (HostController, Arc<MockActionPerformer>) {
        let performer = Arc::new(MockActionPerformer::new());
        let controller = HostController::new(HostComponents {
            host: Arc::new(ProcessStateMachine::new("host", true)),
            suspend: Arc::new(MockSuspendController::already_suspended()),
            performer: performer.clone(),
            repository: Arc::new(InMemoryServerRepository::new()),
            installation: None,
            installation_lock_timeout: None,
        });
        (controller, performer)
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let (controller, _) = controller();

        controller.register_server("app-1", true).await.unwrap();
        assert_eq!(
            controller.register_server("app-1", true).await.unwrap_err(),
            DomainError::DuplicateServer("app-1".to_string())
        );
        assert_eq!(controller.servers().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_keeps_first_server() {
        let (controller, _) = controller();
        let controller = Arc::new(controller);

        let registrations: Vec<_> = (0..8)
            .map(|_| {
                let controller = controller.clone();
                tokio::spawn(async move { controller.register_server("app-1", true).await })
            })
            .collect();

        let mut registered = Vec::new();
        for registration in registrations {
            match registration.await.unwrap() {
                Ok(server) => registered.push(server),
                Err(e) => assert_eq!(e, DomainError::DuplicateServer("app-1".to_string())),
            }
        }

        assert_eq!(registered.len(), 1);
        let stored = controller.server("app-1").await.unwrap();
        assert!(Arc::ptr_eq(&stored, &registered[0]));
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let (controller, _) = controller();
        let server = controller.register_server("app-1", true).await.unwrap();
        let transport = Arc::new(LoopbackTransport::new(server.mirror().clone()));

        controller
            .connect_server("app-1", transport.clone())
            .await
            .unwrap();
        assert!(server.is_connected());

        assert!(controller
            .disconnect_server("app-1", transport.as_ref())
            .await
            .unwrap());
        assert!(!server.is_connected());
    }

    #[tokio::test]
    async fn test_unknown_server() {
        let (controller, _) = controller();
        assert!(matches!(
            controller.unregister_server("ghost").await,
            Err(DomainError::ServerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_console_follows_host_lifecycle() {
        let (controller, _) = controller();
        assert!(!controller.console_available());

        controller.host().set_running();
        assert!(controller.console_available());

        let response = controller
            .shutdown(ShutdownHostCommand::shutdown())
            .await
            .unwrap();
        assert!(matches!(
            response.outcome,
            DrainOutcome::Performed {
                disposition: Some(ExitDisposition::Normal),
                ..
            }
        ));
        assert!(!controller.console_available());
    }

    #[tokio::test]
    async fn test_reload_through_controller() {
        let (controller, performer) = controller();
        controller.host().set_running();

        let response = controller.reload(ReloadHostCommand::default()).await.unwrap();

        assert!(response.outcome.is_performed());
        assert_eq!(performer.reloads().len(), 1);
        assert!(controller.console_available());
    }
}
