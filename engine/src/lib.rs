//! Lifecycle and drain control for a host process and the servers it manages.
//!
//! - `domain`: state machines, stamped flags, the fan-out executor, the
//!   remote operation proxy and the graceful drain coordinator
//! - `infrastructure`: adapters for admission control, transports,
//!   installation state, configuration and storage
//! - `application`: the host controller composition root

pub mod application;
pub mod constants;
pub mod domain;
pub mod infrastructure;
