//! Installation manager port

use crate::domain::DomainError;
use async_trait::async_trait;

/// Port to the mechanism that stages updates for the next start
#[async_trait]
pub trait InstallationManager: Send + Sync {
    /// Whether an installation is staged and waiting for a restart
    fn installation_pending(&self) -> bool;

    /// Wait until no client holds the installation lock
    async fn wait_for_client_release(&self) -> Result<(), DomainError>;
}
