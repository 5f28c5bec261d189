//! In-Memory Server Repository
//! Thread-safe implementation of ServerRepository port

use crate::domain::{ports::ServerRepository, DomainError, ManagedServer};
use async_trait::async_trait;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Thread-safe in-memory server registry, ordered by server name
#[derive(Clone, Default)]
pub struct InMemoryServerRepository {
    servers: Arc<RwLock<BTreeMap<String, Arc<ManagedServer>>>>,
}

impl InMemoryServerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServerRepository for InMemoryServerRepository {
    async fn create(&self, server: Arc<ManagedServer>) -> Result<(), DomainError> {
        let mut servers = self.servers.write().unwrap_or_else(PoisonError::into_inner);
        match servers.entry(server.name().to_string()) {
            Entry::Occupied(entry) => Err(DomainError::DuplicateServer(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(server = %entry.key(), "Adding server to repository");
                entry.insert(server);
                Ok(())
            }
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Arc<ManagedServer>>, DomainError> {
        let servers = self.servers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(servers.get(name).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Arc<ManagedServer>>, DomainError> {
        let servers = self.servers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(servers.values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<(), DomainError> {
        debug!(server = %name, "Deleting server from repository");

        let mut servers = self.servers.write().unwrap_or_else(PoisonError::into_inner);
        servers.remove(name);

        info!(
            server = %name,
            remaining_servers = servers.len(),
            "Server deleted successfully"
        );
        Ok(())
    }
}
