//! Repository port for managed servers
//! This is an interface - implementations are in infrastructure layer

use crate::domain::{DomainError, ManagedServer};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Add a server whose name is not taken yet
    ///
    /// Fails with `DuplicateServer`, leaving the registered server in place,
    /// when the name already exists.
    async fn create(&self, server: Arc<ManagedServer>) -> Result<(), DomainError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Arc<ManagedServer>>, DomainError>;

    /// List all servers sorted by name
    async fn find_all(&self) -> Result<Vec<Arc<ManagedServer>>, DomainError>;

    async fn delete(&self, name: &str) -> Result<(), DomainError>;

    /// Find a server by name, failing when it is not registered
    async fn get(&self, name: &str) -> Result<Arc<ManagedServer>, DomainError> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::ServerNotFound(name.to_string()))
    }
}
