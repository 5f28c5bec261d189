pub mod exit_disposition;
pub mod identifiers;
pub mod process_phase;
pub mod remote_operation;
pub mod stamp;
pub mod suspend_state;

pub use exit_disposition::ExitDisposition;
pub use identifiers::{ListenerId, OperationId, TransportId};
pub use process_phase::{DisplayState, ProcessPhase, Requirement};
pub use remote_operation::{OperationKind, OperationResult, RemoteOperation};
pub use stamp::Stamp;
pub use suspend_state::{SuspendState, SuspendTimeout};
