//! Action performer port
//! Carries out the terminal step of a drain: reload in place or exit

use crate::domain::{DomainError, ExitDisposition};
use async_trait::async_trait;

/// Options for an in-place reload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadOptions {
    /// Reload only the administrative surface
    pub admin_only: bool,
    /// Keep the running configuration instead of rereading it from disk
    pub use_current_config: bool,
}

#[async_trait]
pub trait ActionPerformer: Send + Sync {
    async fn reload(&self, options: &ReloadOptions) -> Result<(), DomainError>;

    /// Request process exit with the given disposition
    ///
    /// Implementations record the disposition and signal the host to exit;
    /// they do not terminate the process themselves.
    async fn exit(&self, disposition: ExitDisposition) -> Result<(), DomainError>;
}
