//! Shared test utilities for E2E tests
//!
//! Every test builds its own in-process host: a `HostController` over an
//! `AdmissionController`, an in-memory server repository and a recording
//! action performer. Nothing is shared between tests.
//!
//! Set `DC_TEST_LOG=debug` to see the engine's logs while a test runs.

use dc_engine::application::{HostComponents, HostController};
use dc_engine::domain::ports::{
    InstallationManager, MockActionPerformer, OperationFuture, Transport,
};
use dc_engine::domain::{
    DomainError, ManagedServer, OperationResult, ProcessStateMachine, RemoteOperation,
    TransportId,
};
use dc_engine::infrastructure::{AdmissionController, InMemoryServerRepository, LoopbackTransport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

/// Install a test log subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        if let Ok(filter) = std::env::var("DC_TEST_LOG") {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .with_test_writer()
                .try_init();
        }
    });
}

/// In-process host with handles on its collaborators
pub struct TestHost {
    pub controller: HostController,
    pub host: Arc<ProcessStateMachine>,
    pub admission: Arc<AdmissionController>,
    pub performer: Arc<MockActionPerformer>,
}

pub struct TestHostBuilder {
    reload_capable: bool,
    installation: Option<Arc<dyn InstallationManager>>,
    installation_lock_timeout: Option<Duration>,
}

impl Default for TestHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHostBuilder {
    pub fn new() -> Self {
        Self {
            reload_capable: true,
            installation: None,
            installation_lock_timeout: None,
        }
    }

    pub fn reload_capable(mut self, reload_capable: bool) -> Self {
        self.reload_capable = reload_capable;
        self
    }

    pub fn installation(mut self, installation: Arc<dyn InstallationManager>) -> Self {
        self.installation = Some(installation);
        self
    }

    pub fn installation_lock_timeout(mut self, timeout: Duration) -> Self {
        self.installation_lock_timeout = Some(timeout);
        self
    }

    /// Build the host and move it to running
    pub fn build(self) -> TestHost {
        init_tracing();

        let host = Arc::new(ProcessStateMachine::new("test-host", self.reload_capable));
        let admission = Arc::new(AdmissionController::new());
        let performer = Arc::new(MockActionPerformer::new());

        let controller = HostController::new(HostComponents {
            host: host.clone(),
            suspend: admission.clone(),
            performer: performer.clone(),
            repository: Arc::new(InMemoryServerRepository::new()),
            installation: self.installation,
            installation_lock_timeout: self.installation_lock_timeout,
        });
        host.set_running();

        TestHost {
            controller,
            host,
            admission,
            performer,
        }
    }
}

/// Running host with default settings
pub fn setup_host() -> TestHost {
    TestHostBuilder::new().build()
}

impl TestHost {
    /// Register a server and connect it over loopback to its own mirror
    pub async fn add_loopback_server(&self, name: &str) -> Arc<ManagedServer> {
        let server = self
            .controller
            .register_server(name, true)
            .await
            .expect("register server");
        self.controller
            .connect_server(name, Arc::new(LoopbackTransport::new(server.mirror().clone())))
            .await
            .expect("connect server");
        server.mirror().set_running();
        server
    }
}

/// Poll `condition` until it holds or `limit` runs out
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    true
}

/// Transport whose operations never finish; counts dispatches
pub struct HangingTransport {
    id: TransportId,
    dispatched: AtomicUsize,
}

impl HangingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: TransportId::generate(),
            dispatched: AtomicUsize::new(0),
        })
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }
}

impl Transport for HangingTransport {
    fn id(&self) -> TransportId {
        self.id
    }

    fn dispatch(&self, _operation: RemoteOperation) -> Result<OperationFuture, DomainError> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(std::future::pending()))
    }
}

/// Transport whose operations fail after `delay`
pub struct FailingTransport {
    id: TransportId,
    delay: Duration,
}

impl FailingTransport {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: TransportId::generate(),
            delay,
        })
    }
}

impl Transport for FailingTransport {
    fn id(&self) -> TransportId {
        self.id
    }

    fn dispatch(&self, operation: RemoteOperation) -> Result<OperationFuture, DomainError> {
        let delay = self.delay;
        Ok(Box::pin(async move {
            tokio::time::sleep(delay).await;
            Err(DomainError::OperationFailed(format!(
                "{} rejected by server",
                operation.kind
            )))
        }))
    }
}

/// Transport that answers after `delay`
pub struct SlowTransport {
    id: TransportId,
    delay: Duration,
}

impl SlowTransport {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: TransportId::generate(),
            delay,
        })
    }
}

impl Transport for SlowTransport {
    fn id(&self) -> TransportId {
        self.id
    }

    fn dispatch(&self, operation: RemoteOperation) -> Result<OperationFuture, DomainError> {
        let delay = self.delay;
        Ok(Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(OperationResult::Success(operation.payload))
        }))
    }
}
