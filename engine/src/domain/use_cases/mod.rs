pub mod reload_host;
pub mod rollout_operation;
pub mod shutdown_host;

pub use reload_host::{ReloadHost, ReloadHostUseCase};
pub use rollout_operation::{RolloutOperation, RolloutOperationUseCase};
pub use shutdown_host::{ShutdownHost, ShutdownHostUseCase};
