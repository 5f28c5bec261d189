//! Availability gate for the administrative console
//!
//! Opens when the host first reaches a running display state and closes again
//! once it starts stopping. The gate only ever closes with the stamp it was
//! opened with, so a newer opening is never undone by a stale close.

use crate::domain::services::{ProcessStateMachine, StampedFlag};
use crate::domain::{DisplayState, ListenerId, Stamp};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct ConsoleAvailability {
    flag: StampedFlag,
    opened_with: Mutex<Option<Stamp>>,
    subscription: OnceLock<ListenerId>,
}

impl ConsoleAvailability {
    /// Create a gate that follows `process`
    pub fn attach(process: &ProcessStateMachine) -> Arc<Self> {
        let gate = Arc::new(Self::default());
        let listener = gate.clone();
        let id = process.subscribe(Arc::new(move |_old: DisplayState, new: DisplayState| {
            listener.observe(new)
        }));
        let _ = gate.subscription.set(id);
        gate.observe(process.get_state());
        gate
    }

    /// Stop following `process`
    pub fn detach(&self, process: &ProcessStateMachine) -> bool {
        self.subscription
            .get()
            .is_some_and(|id| process.unsubscribe(*id))
    }

    pub fn is_available(&self) -> bool {
        self.flag.is_active()
    }

    fn observe(&self, state: DisplayState) {
        let mut opened_with = self.opened_with.lock().unwrap_or_else(PoisonError::into_inner);
        match state {
            s if s.is_running() => {
                if opened_with.is_none() {
                    let stamp = self.flag.activate();
                    *opened_with = Some(stamp);
                    info!(stamp = %stamp, "Console available");
                }
            }
            DisplayState::Stopping | DisplayState::Stopped => {
                if let Some(stamp) = opened_with.take() {
                    if self.flag.revert(stamp) {
                        info!("Console unavailable");
                    } else {
                        debug!(stamp = %stamp, "Console gate already superseded");
                    }
                }
            }
            _ => {}
        }
    }
}
