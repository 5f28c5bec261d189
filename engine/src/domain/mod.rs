pub mod commands;
pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod use_cases;
pub mod value_objects;

pub use commands::{
    ReloadHostCommand, ReloadHostResponse, RolloutOperationCommand, RolloutOperationResponse,
    ServerOutcome, ShutdownHostCommand, ShutdownHostResponse,
};
pub use entities::ManagedServer;
pub use error::{DomainError, Result};
pub use services::{ConcurrentFanoutExecutor, GracefulDrainCoordinator, ProcessStateMachine};
pub use value_objects::{
    DisplayState, ExitDisposition, ListenerId, OperationId, OperationKind, OperationResult,
    ProcessPhase, RemoteOperation, Requirement, Stamp, SuspendState, SuspendTimeout, TransportId,
};
