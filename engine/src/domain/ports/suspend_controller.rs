//! Suspend controller port
//! Admission control over incoming requests while a process drains

use crate::domain::{ListenerId, SuspendState, SuspendTimeout};
use std::sync::Arc;

/// Callbacks fired by a suspend controller
///
/// At most one of `complete`, `cancelled` and `timeout` fires per suspend
/// request.
pub trait SuspendListener: Send + Sync {
    fn suspend_started(&self) {}

    /// Every in-flight request finished
    fn complete(&self);

    /// The suspend was revoked by a resume
    fn cancelled(&self);

    /// The suspend timeout elapsed with requests still in flight
    fn timeout(&self);
}

/// Port for suspending and resuming request admission
pub trait SuspendController: Send + Sync {
    fn state(&self) -> SuspendState;

    fn add_listener(&self, listener: Arc<dyn SuspendListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Stop admitting new requests and wait for in-flight ones to drain
    ///
    /// Every call leads to a result for listeners registered before it, even
    /// when a suspension is already in progress or complete.
    fn suspend(&self, timeout: SuspendTimeout);

    /// Admit requests again, cancelling a suspend in progress
    fn resume(&self);
}
