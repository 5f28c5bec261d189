//! Infrastructure Layer
//!
//! This module contains the adapters that implement the ports defined in the domain layer.
//! These are the "driven adapters" (infrastructure implementations).
//!
//! ## Adapters
//!
//! - `AdmissionController`: In-memory request admission with suspend/resume
//! - `LoopbackTransport`: In-process transport to a local state machine
//! - `DaemonActionPerformer`: Hands reloads and exits to the daemon loop
//! - `FileInstallationManager`: Staged installation and client lock as files
//! - `InMemoryServerRepository`: Thread-safe in-memory registry of managed servers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dc_engine::infrastructure::{AdmissionController, InMemoryServerRepository};
//! use std::sync::Arc;
//!
//! let admission = Arc::new(AdmissionController::new());
//! let repository = Arc::new(InMemoryServerRepository::new());
//!
//! // Wire into the host controller...
//! ```

pub mod admission_controller;
pub mod config;
pub mod daemon_action_performer;
pub mod file_installation_manager;
pub mod in_memory_server_repository;
pub mod loopback_transport;

pub use admission_controller::{AdmissionController, AdmissionGuard};
pub use config::{load_servers_from_dir, Config, InstallationConfig, ServerConfig};
pub use daemon_action_performer::{DaemonActionPerformer, ReloadRequest};
pub use file_installation_manager::FileInstallationManager;
pub use in_memory_server_repository::InMemoryServerRepository;
pub use loopback_transport::LoopbackTransport;
