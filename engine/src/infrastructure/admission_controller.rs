//! Admission Controller
//! In-memory implementation of the SuspendController port
//!
//! Requests enter through `try_admit` and hold an `AdmissionGuard` while in
//! flight. A suspend stops admitting new requests and reports `complete` once
//! the in-flight count reaches zero, or `timeout` if a bounded wait runs out
//! first. A suspend issued while another one is still waiting shares its
//! result, with its own timeout armed as well; one issued after the previous
//! request already timed out starts a new wait. Suspending while already
//! suspended reports `complete` straight away. Listener callbacks always run
//! outside the state lock.

use crate::domain::ports::{SuspendController, SuspendListener};
use crate::domain::{ListenerId, SuspendState, SuspendTimeout};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct AdmissionState {
    suspend: SuspendState,
    active: usize,
    /// Bumped by every suspend and resume so stale timers can be recognized
    generation: u64,
    /// The current suspend request already reported its result
    settled: bool,
}

#[derive(Default)]
struct Inner {
    state: Mutex<AdmissionState>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn SuspendListener>)>>,
    next_listener_id: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, AdmissionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, callback: impl Fn(&dyn SuspendListener)) {
        let listeners: Vec<Arc<dyn SuspendListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            callback(listener.as_ref());
        }
    }

    fn release(&self) {
        let drained = {
            let mut state = self.lock();
            state.active = state.active.saturating_sub(1);
            if state.active == 0 && state.suspend == SuspendState::Suspending {
                state.suspend = SuspendState::Suspended;
                let report = !state.settled;
                state.settled = true;
                report
            } else {
                false
            }
        };

        if drained {
            info!("Last in-flight request finished, suspended");
            self.notify(|listener| listener.complete());
        }
    }

    fn expire(&self, generation: u64) {
        let expired = {
            let mut state = self.lock();
            let live = state.suspend == SuspendState::Suspending
                && state.generation == generation
                && !state.settled;
            if live {
                state.settled = true;
            }
            live.then_some(state.active)
        };

        if let Some(in_flight) = expired {
            warn!(in_flight, "Suspend timed out with requests still in flight");
            self.notify(|listener| listener.timeout());
        }
    }
}

/// What a suspend call found and did
enum SuspendRequest {
    AlreadySuspended,
    /// Another request for the same suspension is still waiting
    Joined(u64),
    Drained,
    Started(u64),
}

/// Keeps one admitted request counted as in flight until dropped
pub struct AdmissionGuard {
    inner: Arc<Inner>,
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.inner.release();
    }
}

impl std::fmt::Debug for AdmissionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGuard").finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct AdmissionController {
    inner: Arc<Inner>,
}

impl AdmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a request, or refuse it while suspending or suspended
    pub fn try_admit(&self) -> Option<AdmissionGuard> {
        let mut state = self.inner.lock();
        if state.suspend != SuspendState::Running {
            debug!(state = %state.suspend, "Request refused");
            return None;
        }
        state.active += 1;
        Some(AdmissionGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn active_requests(&self) -> usize {
        self.inner.lock().active
    }

    /// Report a timeout for `generation` once `timeout` has passed
    fn arm(&self, generation: u64, timeout: SuspendTimeout) {
        match timeout {
            SuspendTimeout::Immediate => self.inner.expire(generation),
            SuspendTimeout::Bounded(after) => self.schedule_expiry(generation, after),
            SuspendTimeout::Infinite => {}
        }
    }

    fn schedule_expiry(&self, generation: u64, after: Duration) {
        let inner = Arc::clone(&self.inner);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(after).await;
                    inner.expire(generation);
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(after);
                    inner.expire(generation);
                });
            }
        }
    }
}

impl SuspendController for AdmissionController {
    fn state(&self) -> SuspendState {
        self.inner.lock().suspend
    }

    fn add_listener(&self, listener: Arc<dyn SuspendListener>) -> ListenerId {
        let id = ListenerId::new(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    fn suspend(&self, timeout: SuspendTimeout) {
        let request = {
            let mut state = self.inner.lock();
            match state.suspend {
                SuspendState::Suspended => SuspendRequest::AlreadySuspended,
                SuspendState::Suspending if !state.settled => {
                    SuspendRequest::Joined(state.generation)
                }
                // Running, or suspending after an earlier request already timed out
                _ => {
                    state.generation += 1;
                    state.settled = state.active == 0;
                    if state.settled {
                        state.suspend = SuspendState::Suspended;
                        SuspendRequest::Drained
                    } else {
                        state.suspend = SuspendState::Suspending;
                        SuspendRequest::Started(state.generation)
                    }
                }
            }
        };

        match request {
            SuspendRequest::AlreadySuspended => {
                debug!("Already suspended");
                self.inner.notify(|listener| listener.complete());
            }
            SuspendRequest::Joined(generation) => {
                debug!(timeout_ms = timeout.as_millis(), "Joining suspend in progress");
                self.arm(generation, timeout);
            }
            SuspendRequest::Drained => {
                info!(timeout_ms = timeout.as_millis(), "Suspending request admission");
                self.inner.notify(|listener| listener.suspend_started());
                info!("No requests in flight, suspended");
                self.inner.notify(|listener| listener.complete());
            }
            SuspendRequest::Started(generation) => {
                info!(timeout_ms = timeout.as_millis(), "Suspending request admission");
                self.inner.notify(|listener| listener.suspend_started());
                self.arm(generation, timeout);
            }
        }
    }

    fn resume(&self) {
        let cancelled = {
            let mut state = self.inner.lock();
            let cancelled = state.suspend == SuspendState::Suspending && !state.settled;
            state.suspend = SuspendState::Running;
            state.generation += 1;
            state.settled = false;
            cancelled
        };

        info!("Resuming request admission");
        if cancelled {
            self.inner.notify(|listener| listener.cancelled());
        }
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("AdmissionController")
            .field("state", &state.suspend)
            .field("active", &state.active)
            .finish()
    }
}
