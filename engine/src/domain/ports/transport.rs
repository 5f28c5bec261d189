//! Transport port
//! A connection to a managed server that carries remote operations

use crate::domain::{DomainError, OperationResult, RemoteOperation, TransportId};
use std::future::Future;
use std::pin::Pin;

/// In-flight remote operation as returned by a transport
pub type OperationFuture = Pin<Box<dyn Future<Output = Result<OperationResult, DomainError>> + Send>>;

/// Port for sending operations over one connection
///
/// `dispatch` must not block; the returned future resolves once the remote
/// side answers. Dropping the future abandons the operation.
pub trait Transport: Send + Sync {
    /// Identity of this connection, stable for its lifetime
    fn id(&self) -> TransportId;

    /// Start a remote operation
    fn dispatch(&self, operation: RemoteOperation) -> Result<OperationFuture, DomainError>;
}
