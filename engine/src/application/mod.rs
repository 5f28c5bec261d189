//! Application Layer
//!
//! Composition root wiring the domain use cases to their collaborators.

pub mod host_controller;

pub use host_controller::{HostComponents, HostController};
