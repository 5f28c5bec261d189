pub mod concurrent_fanout_executor;
pub mod console_availability;
pub mod disconnected_transport;
pub mod graceful_drain_coordinator;
pub mod process_state_machine;
pub mod remote_operation_proxy;
pub mod stamped_flag;

pub use concurrent_fanout_executor::{
    BatchTask, ConcurrentBatch, ConcurrentFanoutExecutor, FanoutReport, TaskOutcome, TaskReport,
};
pub use console_availability::ConsoleAvailability;
pub use disconnected_transport::{apply_administrative, DisconnectedTransport};
pub use graceful_drain_coordinator::{
    DrainAction, DrainOutcome, DrainPhase, DrainTicket, DrainTrigger, GracefulDrainCoordinator,
};
pub use process_state_machine::{ProcessStateMachine, StateListener};
pub use remote_operation_proxy::{AsyncOperation, RemoteOperationProxy};
pub use stamped_flag::StampedFlag;
