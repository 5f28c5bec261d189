pub mod action_performer;
pub mod installation_manager;
pub mod mock_collaborators;
pub mod server_repository;
pub mod suspend_controller;
pub mod transport;

pub use action_performer::{ActionPerformer, ReloadOptions};
pub use installation_manager::InstallationManager;
pub use mock_collaborators::{MockActionPerformer, MockInstallationManager, MockSuspendController};
pub use server_repository::ServerRepository;
pub use suspend_controller::{SuspendController, SuspendListener};
pub use transport::{OperationFuture, Transport};
