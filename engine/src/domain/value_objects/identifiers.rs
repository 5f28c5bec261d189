//! Identifier value objects
//! Immutable identities for transports, in-flight operations and listeners

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one transport instance attached to a remote operation proxy
///
/// Every connect produces a fresh identity, so a stale disconnect notification
/// can never be confused with the transport that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportId(Uuid);

impl TransportId {
    /// Generate a new random TransportId
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Identity reserved for the disconnected sentinel transport
    pub fn disconnected() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the disconnected sentinel's identity
    pub fn is_disconnected(&self) -> bool {
        self.0.is_nil()
    }

    /// Parse from string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_disconnected() {
            write!(f, "disconnected")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<Uuid> for TransportId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identity of a single in-flight remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by a subscription, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}
