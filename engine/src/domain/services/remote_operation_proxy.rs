//! Remote Operation Proxy
//!
//! Forwards operations to whichever transport is currently attached for a
//! subordinate server and tracks the in-flight ones per transport, so a
//! transport going away takes exactly its own operations with it.

use crate::domain::ports::{OperationFuture, Transport};
use crate::domain::services::{DisconnectedTransport, ProcessStateMachine};
use crate::domain::{DomainError, OperationId, OperationResult, RemoteOperation, TransportId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct ProxyState {
    current: Arc<dyn Transport>,
    pending: HashMap<TransportId, HashMap<OperationId, CancellationToken>>,
}

impl ProxyState {
    /// Remove and cancel everything registered under a transport
    fn cancel_pending(&mut self, transport: TransportId) -> usize {
        let cancelled = self.pending.remove(&transport).unwrap_or_default();
        for token in cancelled.values() {
            token.cancel();
        }
        cancelled.len()
    }
}

fn lock_state(state: &Mutex<ProxyState>) -> MutexGuard<'_, ProxyState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to an operation started through the proxy
///
/// Resolves to the operation's result, or to `OperationCancelled` when it was
/// cancelled explicitly or its transport was disconnected. Dropping the
/// handle cancels the operation.
pub struct AsyncOperation {
    id: OperationId,
    transport: TransportId,
    token: CancellationToken,
    handle: JoinHandle<Result<OperationResult, DomainError>>,
}

impl AsyncOperation {
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Transport the operation was dispatched on
    pub fn transport_id(&self) -> TransportId {
        self.transport
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Future for AsyncOperation {
    type Output = Result<OperationResult, DomainError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) if join_error.is_cancelled() => {
                Poll::Ready(Err(DomainError::OperationCancelled))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(DomainError::TaskPanicked(format!(
                "operation {}",
                self.id
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for AsyncOperation {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for AsyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

pub struct RemoteOperationProxy {
    server: String,
    disconnected: Arc<dyn Transport>,
    state: Arc<Mutex<ProxyState>>,
}

impl RemoteOperationProxy {
    /// Create a proxy with no live connection
    ///
    /// While disconnected, administrative operations are applied to `mirror`.
    pub fn new(server: impl Into<String>, mirror: Arc<ProcessStateMachine>) -> Self {
        let server = server.into();
        let disconnected: Arc<dyn Transport> =
            Arc::new(DisconnectedTransport::new(server.clone(), mirror));
        Self {
            state: Arc::new(Mutex::new(ProxyState {
                current: disconnected.clone(),
                pending: HashMap::new(),
            })),
            disconnected,
            server,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Identity of the active transport
    pub fn transport_id(&self) -> TransportId {
        lock_state(&self.state).current.id()
    }

    pub fn is_connected(&self) -> bool {
        !self.transport_id().is_disconnected()
    }

    /// Attach a new active transport
    ///
    /// Operations still pending on the transport being replaced are cancelled.
    pub fn connected(&self, transport: Arc<dyn Transport>) {
        let new_id = transport.id();
        let mut state = lock_state(&self.state);
        let old_id = state.current.id();
        if old_id == new_id {
            debug!(server = %self.server, transport = %new_id, "Transport already attached");
            return;
        }

        state.current = transport;
        let cancelled = state.cancel_pending(old_id);
        info!(
            server = %self.server,
            transport = %new_id,
            replaced = %old_id,
            cancelled,
            "Transport connected"
        );
    }

    /// Detach `transport` if it is still the active one
    ///
    /// Returns false, doing nothing, when a newer transport has already taken
    /// its place.
    pub fn disconnected(&self, transport: &dyn Transport) -> bool {
        let id = transport.id();
        let mut state = lock_state(&self.state);
        if state.current.id() != id {
            debug!(
                server = %self.server,
                transport = %id,
                "Ignoring disconnect of a replaced transport"
            );
            return false;
        }

        state.current = self.disconnected.clone();
        let cancelled = state.cancel_pending(id);
        info!(server = %self.server, transport = %id, cancelled, "Transport disconnected");
        true
    }

    /// Dispatch an operation on the active transport
    ///
    /// Must be called from within a tokio runtime. Fails immediately when the
    /// transport rejects the operation, e.g. with `ChannelClosed` while
    /// disconnected.
    pub fn execute(&self, operation: RemoteOperation) -> Result<AsyncOperation, DomainError> {
        let transport = lock_state(&self.state).current.clone();
        let transport_id = transport.id();
        let kind = operation.kind.clone();
        let future = transport.dispatch(operation)?;

        let id = OperationId::generate();
        let token = CancellationToken::new();
        if transport_id.is_disconnected() {
            // Applied to the local mirror already; nothing a reconnect could cancel
            debug!(server = %self.server, operation = %kind, "Operation handled while disconnected");
        } else {
            let mut state = lock_state(&self.state);
            if state.current.id() == transport_id {
                state
                    .pending
                    .entry(transport_id)
                    .or_default()
                    .insert(id, token.clone());
            } else {
                debug!(
                    server = %self.server,
                    transport = %transport_id,
                    operation = %kind,
                    "Transport replaced during dispatch, cancelling operation"
                );
                token.cancel();
            }
        }

        let handle = tokio::spawn(Self::track(
            Arc::clone(&self.state),
            transport_id,
            id,
            token.clone(),
            future,
        ));

        Ok(AsyncOperation {
            id,
            transport: transport_id,
            token,
            handle,
        })
    }

    async fn track(
        state: Arc<Mutex<ProxyState>>,
        transport: TransportId,
        id: OperationId,
        token: CancellationToken,
        future: OperationFuture,
    ) -> Result<OperationResult, DomainError> {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(DomainError::OperationCancelled),
            result = future => result,
        };

        let mut state = lock_state(&state);
        if let Some(operations) = state.pending.get_mut(&transport) {
            operations.remove(&id);
            if operations.is_empty() {
                state.pending.remove(&transport);
            }
        }
        result
    }

    /// Number of operations in flight across all transports
    pub fn pending_count(&self) -> usize {
        lock_state(&self.state).pending.values().map(HashMap::len).sum()
    }

    /// Number of operations in flight on one transport
    pub fn pending_for(&self, transport: TransportId) -> usize {
        lock_state(&self.state)
            .pending
            .get(&transport)
            .map_or(0, HashMap::len)
    }
}

impl std::fmt::Debug for RemoteOperationProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteOperationProxy")
            .field("server", &self.server)
            .field("transport", &self.transport_id())
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayState, Requirement};
    use serde_json::json;

    /// Transport whose operations never finish
    struct HangingTransport {
        id: TransportId,
    }

    impl HangingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: TransportId::generate(),
            })
        }
    }

    impl Transport for HangingTransport {
        fn id(&self) -> TransportId {
            self.id
        }

        fn dispatch(&self, _operation: RemoteOperation) -> Result<OperationFuture, DomainError> {
            Ok(Box::pin(std::future::pending()))
        }
    }

    /// Transport that echoes the payload back
    struct EchoTransport {
        id: TransportId,
    }

    impl Transport for EchoTransport {
        fn id(&self) -> TransportId {
            self.id
        }

        fn dispatch(&self, operation: RemoteOperation) -> Result<OperationFuture, DomainError> {
            Ok(Box::pin(async move { Ok(OperationResult::Success(operation.payload)) }))
        }
    }

    /// Transport that swaps in another transport while dispatching
    struct SwappingTransport {
        id: TransportId,
        swap: Mutex<Option<(Arc<RemoteOperationProxy>, Arc<dyn Transport>)>>,
    }

    impl Transport for SwappingTransport {
        fn id(&self) -> TransportId {
            self.id
        }

        fn dispatch(&self, _operation: RemoteOperation) -> Result<OperationFuture, DomainError> {
            if let Some((proxy, next)) = self.swap.lock().unwrap().take() {
                proxy.connected(next);
            }
            Ok(Box::pin(std::future::pending()))
        }
    }

    fn proxy() -> RemoteOperationProxy {
        RemoteOperationProxy::new("app-1", Arc::new(ProcessStateMachine::new("app-1", true)))
    }

    fn op(name: &str) -> RemoteOperation {
        RemoteOperation::named(name, serde_json::Value::Null)
    }

    /// Let the tracking tasks run until nothing is pending
    async fn drain_pending(proxy: &RemoteOperationProxy) {
        for _ in 0..100 {
            if proxy.pending_count() == 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_disconnect_cancels_exactly_the_replaced_set() {
        let proxy = proxy();
        let t1 = HangingTransport::new();
        let t2 = HangingTransport::new();

        proxy.connected(t1.clone());
        let a = proxy.execute(op("a")).unwrap();
        let b = proxy.execute(op("b")).unwrap();
        let c = proxy.execute(op("c")).unwrap();
        assert_eq!(proxy.pending_for(t1.id), 3);

        proxy.connected(t2.clone());
        let d = proxy.execute(op("d")).unwrap();
        assert_eq!(d.transport_id(), t2.id);

        assert!(!proxy.disconnected(t1.as_ref()));
        assert!(!proxy.disconnected(t1.as_ref()));

        for handle in [a, b, c] {
            assert_eq!(handle.await, Err(DomainError::OperationCancelled));
        }
        assert_eq!(proxy.pending_for(t1.id), 0);
        assert_eq!(proxy.pending_for(t2.id), 1);
        assert!(!d.is_cancelled());
        assert!(proxy.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_of_current_transport() {
        let proxy = proxy();
        let t1 = HangingTransport::new();
        proxy.connected(t1.clone());

        let pending = proxy.execute(op("long")).unwrap();
        assert!(proxy.disconnected(t1.as_ref()));

        assert_eq!(pending.await, Err(DomainError::OperationCancelled));
        assert_eq!(proxy.pending_count(), 0);
        assert!(!proxy.is_connected());

        // Stale repeat
        assert!(!proxy.disconnected(t1.as_ref()));
    }

    #[tokio::test]
    async fn test_completed_operation_is_unregistered() {
        let proxy = proxy();
        let id = TransportId::generate();
        proxy.connected(Arc::new(EchoTransport { id }));

        let result = proxy
            .execute(RemoteOperation::named("ping", json!({"seq": 7})))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(result, OperationResult::Success(json!({"seq": 7})));
        assert_eq!(proxy.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_cancel() {
        let proxy = proxy();
        proxy.connected(HangingTransport::new());

        let handle = proxy.execute(op("slow")).unwrap();
        handle.cancel();

        assert_eq!(handle.await, Err(DomainError::OperationCancelled));
        assert_eq!(proxy.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnected_proxy_rejects_live_operations() {
        let proxy = proxy();
        let err = proxy.execute(op("deploy")).unwrap_err();
        assert_eq!(err, DomainError::ChannelClosed("app-1".to_string()));
    }

    #[tokio::test]
    async fn test_disconnected_proxy_honors_administrative_operations() {
        let mirror = Arc::new(ProcessStateMachine::new("app-1", true));
        mirror.set_running();
        let proxy = RemoteOperationProxy::new("app-1", mirror.clone());

        let raised = proxy
            .execute(RemoteOperation::mark_reload_required())
            .unwrap()
            .await
            .unwrap();
        assert!(matches!(raised, OperationResult::RequirementRaised(_)));
        assert!(mirror.is_required(Requirement::Reload));

        let state = proxy
            .execute(RemoteOperation::read_state())
            .unwrap()
            .await
            .unwrap();
        assert_eq!(state, OperationResult::State(DisplayState::ReloadRequired));
    }

    #[tokio::test]
    async fn test_mirror_operation_survives_reconnect() {
        let mirror = Arc::new(ProcessStateMachine::new("app-1", true));
        mirror.set_running();
        let proxy = RemoteOperationProxy::new("app-1", mirror.clone());

        let handle = proxy
            .execute(RemoteOperation::mark_restart_required())
            .unwrap();
        assert_eq!(proxy.pending_count(), 0);
        proxy.connected(HangingTransport::new());

        let result = handle.await.unwrap();
        assert!(matches!(result, OperationResult::RequirementRaised(_)));
        assert_eq!(mirror.get_state(), DisplayState::RestartRequired);
    }

    #[tokio::test]
    async fn test_dropping_handle_cancels_operation() {
        let proxy = proxy();
        let transport = HangingTransport::new();
        proxy.connected(transport.clone());

        let handle = proxy.execute(op("abandoned")).unwrap();
        let token = handle.token.clone();
        assert_eq!(proxy.pending_for(transport.id), 1);

        drop(handle);
        assert!(token.is_cancelled());
        drain_pending(&proxy).await;
        assert_eq!(proxy.pending_count(), 0);
        assert!(proxy.is_connected());
    }

    #[tokio::test]
    async fn test_swap_during_dispatch_cancels_instead_of_registering() {
        let proxy = Arc::new(proxy());
        let replacement = HangingTransport::new();
        let swapping = Arc::new(SwappingTransport {
            id: TransportId::generate(),
            swap: Mutex::new(None),
        });
        let next: Arc<dyn Transport> = replacement.clone();
        *swapping.swap.lock().unwrap() = Some((proxy.clone(), next));
        proxy.connected(swapping.clone());

        let handle = proxy.execute(op("raced")).unwrap();

        assert!(handle.is_cancelled());
        assert_eq!(handle.transport_id(), swapping.id);
        assert_eq!(proxy.pending_for(swapping.id), 0);
        assert_eq!(proxy.transport_id(), replacement.id);
        assert_eq!(handle.await, Err(DomainError::OperationCancelled));
    }
}
