//! Mock collaborators for testing
//! Simple in-memory implementations of the drain ports for unit tests

use crate::domain::{DomainError, ExitDisposition, ListenerId, SuspendState, SuspendTimeout};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{ActionPerformer, InstallationManager, ReloadOptions, SuspendController, SuspendListener};

/// Records every action it is asked to perform
#[derive(Default)]
pub struct MockActionPerformer {
    reloads: Mutex<Vec<ReloadOptions>>,
    exits: Mutex<Vec<ExitDisposition>>,
    fail_reload: AtomicBool,
}

impl MockActionPerformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reloads fail
    pub fn fail_reloads(&self) {
        self.fail_reload.store(true, Ordering::SeqCst);
    }

    pub fn reloads(&self) -> Vec<ReloadOptions> {
        self.reloads.lock().unwrap().clone()
    }

    pub fn exits(&self) -> Vec<ExitDisposition> {
        self.exits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionPerformer for MockActionPerformer {
    async fn reload(&self, options: &ReloadOptions) -> Result<(), DomainError> {
        self.reloads.lock().unwrap().push(*options);
        if self.fail_reload.load(Ordering::SeqCst) {
            return Err(DomainError::ReloadFailed("mock reload failure".to_string()));
        }
        Ok(())
    }

    async fn exit(&self, disposition: ExitDisposition) -> Result<(), DomainError> {
        self.exits.lock().unwrap().push(disposition);
        Ok(())
    }
}

/// Installation manager with a fixed answer
pub struct MockInstallationManager {
    pending: bool,
    release: Result<(), DomainError>,
}

impl MockInstallationManager {
    pub fn pending() -> Self {
        Self {
            pending: true,
            release: Ok(()),
        }
    }

    pub fn none_pending() -> Self {
        Self {
            pending: false,
            release: Ok(()),
        }
    }

    /// Pending installation whose lock is never released cleanly
    pub fn lock_failing() -> Self {
        Self {
            pending: true,
            release: Err(DomainError::InstallationLock("mock lock held".to_string())),
        }
    }
}

#[async_trait]
impl InstallationManager for MockInstallationManager {
    fn installation_pending(&self) -> bool {
        self.pending
    }

    async fn wait_for_client_release(&self) -> Result<(), DomainError> {
        self.release.clone()
    }
}

/// Suspend controller driven by hand from tests
///
/// `suspend` and `resume` only record the call; tests fire the listener
/// callbacks explicitly.
#[derive(Default)]
pub struct MockSuspendController {
    state: Mutex<SuspendState>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn SuspendListener>)>>,
    next_id: AtomicU64,
    suspends: Mutex<Vec<SuspendTimeout>>,
    resumes: AtomicU64,
}

impl MockSuspendController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_suspended() -> Self {
        let controller = Self::default();
        *controller.state.lock().unwrap() = SuspendState::Suspended;
        controller
    }

    pub fn suspend_calls(&self) -> Vec<SuspendTimeout> {
        self.suspends.lock().unwrap().clone()
    }

    pub fn resume_calls(&self) -> u64 {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn SuspendListener>> {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    pub fn fire_complete(&self) {
        *self.state.lock().unwrap() = SuspendState::Suspended;
        self.snapshot().iter().for_each(|l| l.complete());
    }

    pub fn fire_cancelled(&self) {
        *self.state.lock().unwrap() = SuspendState::Running;
        self.snapshot().iter().for_each(|l| l.cancelled());
    }

    pub fn fire_timeout(&self) {
        self.snapshot().iter().for_each(|l| l.timeout());
    }
}

impl SuspendController for MockSuspendController {
    fn state(&self) -> SuspendState {
        *self.state.lock().unwrap()
    }

    fn add_listener(&self, listener: Arc<dyn SuspendListener>) -> ListenerId {
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().unwrap().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn suspend(&self, timeout: SuspendTimeout) {
        self.suspends.lock().unwrap().push(timeout);
        *self.state.lock().unwrap() = SuspendState::Suspending;
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = SuspendState::Running;
    }
}
