//! ManagedServer entity
//! A subordinate server under the host's management

use crate::domain::services::{AsyncOperation, ProcessStateMachine, RemoteOperationProxy};
use crate::domain::{DisplayState, DomainError, RemoteOperation};
use std::sync::Arc;

/// Managed server aggregate
///
/// Holds the host-side mirror of the server's lifecycle state and the proxy
/// that reaches the live server. While the proxy is disconnected,
/// administrative operations land on the mirror.
#[derive(Debug)]
pub struct ManagedServer {
    name: String,
    mirror: Arc<ProcessStateMachine>,
    proxy: Arc<RemoteOperationProxy>,
}

impl ManagedServer {
    pub fn new(name: impl Into<String>, reload_capable: bool) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "server name cannot be empty".to_string(),
            ));
        }

        let mirror = Arc::new(ProcessStateMachine::new(name.clone(), reload_capable));
        let proxy = Arc::new(RemoteOperationProxy::new(name.clone(), mirror.clone()));
        Ok(Self {
            name,
            mirror,
            proxy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mirror(&self) -> &Arc<ProcessStateMachine> {
        &self.mirror
    }

    pub fn proxy(&self) -> &Arc<RemoteOperationProxy> {
        &self.proxy
    }

    pub fn is_connected(&self) -> bool {
        self.proxy.is_connected()
    }

    /// Display state as last mirrored on the host
    pub fn state(&self) -> DisplayState {
        self.mirror.get_state()
    }

    pub fn execute(&self, operation: RemoteOperation) -> Result<AsyncOperation, DomainError> {
        self.proxy.execute(operation)
    }
}
