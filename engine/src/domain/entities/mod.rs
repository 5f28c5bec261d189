pub mod managed_server;

pub use managed_server::ManagedServer;
