pub mod reload_host;
pub mod rollout_operation;
pub mod shutdown_host;

pub use reload_host::{ReloadHostCommand, ReloadHostResponse};
pub use rollout_operation::{RolloutOperationCommand, RolloutOperationResponse, ServerOutcome};
pub use shutdown_host::{ShutdownHostCommand, ShutdownHostResponse};
