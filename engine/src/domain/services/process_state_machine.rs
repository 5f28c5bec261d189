//! Process State Machine
//!
//! Owns the lifecycle phase of one managed process and its sticky
//! restart/reload requirements, derives the display state, and notifies
//! subscribers whenever that display state changes.
//!
//! All writes are serialized by the phase lock. Change notifications are
//! queued under that lock, so they leave in write order, and are delivered
//! after it is released, so a listener may call back into the machine.
//!
//! One thread delivers at a time. A writer that finds delivery already under
//! way leaves its change to that thread and returns before listeners have
//! seen it; otherwise the writer delivers everything queued, its own change
//! included, before returning.

use crate::domain::services::StampedFlag;
use crate::domain::value_objects::{DisplayState, ListenerId, ProcessPhase, Requirement, Stamp};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info};

/// Observer of display state changes
pub trait StateListener: Send + Sync {
    fn state_changed(&self, old: DisplayState, new: DisplayState);
}

impl<F> StateListener for F
where
    F: Fn(DisplayState, DisplayState) + Send + Sync,
{
    fn state_changed(&self, old: DisplayState, new: DisplayState) {
        self(old, new)
    }
}

#[derive(Default)]
struct NotificationQueue {
    pending: VecDeque<(DisplayState, DisplayState)>,
    delivering: bool,
}

/// Releases the delivery role if a listener panics mid-delivery
struct DeliveryGuard<'a> {
    queue: &'a Mutex<NotificationQueue>,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .delivering = false;
        }
    }
}

pub struct ProcessStateMachine {
    name: String,
    reload_capable: bool,
    restart_required: StampedFlag,
    reload_required: StampedFlag,
    phase: Mutex<ProcessPhase>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn StateListener>)>>,
    next_listener_id: AtomicU64,
    notifications: Mutex<NotificationQueue>,
}

impl ProcessStateMachine {
    /// Create a state machine for a process that is starting up
    ///
    /// When `reload_capable` is false, every reload requirement is promoted to
    /// a restart requirement.
    pub fn new(name: impl Into<String>, reload_capable: bool) -> Self {
        Self {
            name: name.into(),
            reload_capable,
            restart_required: StampedFlag::new(),
            reload_required: StampedFlag::new(),
            phase: Mutex::new(ProcessPhase::Starting),
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            notifications: Mutex::new(NotificationQueue::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_reload_capable(&self) -> bool {
        self.reload_capable
    }

    pub fn set_starting(&self) {
        self.set_phase(ProcessPhase::Starting);
    }

    /// Enter the running phase
    ///
    /// Sticky requirements raised before are kept: coming back up after a
    /// reload does not apply a pending restart.
    pub fn set_running(&self) {
        self.set_phase(ProcessPhase::Running);
    }

    pub fn set_stopping(&self) {
        self.set_phase(ProcessPhase::Stopping);
    }

    pub fn set_stopped(&self) {
        self.set_phase(ProcessPhase::Stopped);
    }

    pub fn phase(&self) -> ProcessPhase {
        *self.lock_phase()
    }

    /// Raise the restart requirement and return its stamp
    pub fn set_restart_required(&self) -> Stamp {
        let stamp = self.write(|_| self.restart_required.activate());
        debug!(process = %self.name, stamp = %stamp, "Restart required");
        stamp
    }

    /// Raise the reload requirement and return its stamp
    pub fn set_reload_required(&self) -> Stamp {
        if !self.reload_capable {
            debug!(
                process = %self.name,
                "Process cannot reload, promoting reload requirement to restart"
            );
            return self.set_restart_required();
        }

        let stamp = self.write(|_| self.reload_required.activate());
        debug!(process = %self.name, stamp = %stamp, "Reload required");
        stamp
    }

    pub fn revert_restart_required(&self, stamp: Stamp) {
        self.revert(Requirement::Restart, stamp);
    }

    /// Revert a reload requirement raised with `stamp`
    ///
    /// On a process that cannot reload the stamp came from the promoted
    /// restart flag, so that is the flag reverted.
    pub fn revert_reload_required(&self, stamp: Stamp) {
        self.revert(self.reload_target(), stamp);
    }

    /// Whether a sticky requirement is currently raised
    pub fn is_required(&self, requirement: Requirement) -> bool {
        let _phase = self.lock_phase();
        self.flag(requirement).is_active()
    }

    pub fn get_state(&self) -> DisplayState {
        let phase = self.lock_phase();
        self.display_for(*phase)
    }

    /// Register a listener notified with `(old, new)` on every display state change
    ///
    /// Listeners run on whichever writer thread holds the delivery role, never
    /// under the state lock. A write made while another thread (or a listener
    /// on this thread) is delivering returns before its own notification has
    /// gone out; it is delivered in order by the thread already delivering.
    pub fn subscribe(&self, listener: Arc<dyn StateListener>) -> ListenerId {
        let id = ListenerId::new(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        debug!(process = %self.name, listener = %id, "State listener subscribed");
        id
    }

    /// Remove a listener; returns false if it was not subscribed
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    fn set_phase(&self, next: ProcessPhase) {
        self.write(|phase| *phase = next);
    }

    fn revert(&self, requirement: Requirement, stamp: Stamp) {
        let reverted = self.write(|_| self.flag(requirement).revert(stamp));
        if reverted {
            debug!(
                process = %self.name,
                requirement = %requirement,
                stamp = %stamp,
                "Requirement reverted"
            );
        } else {
            debug!(
                process = %self.name,
                requirement = %requirement,
                stamp = %stamp,
                "Ignoring revert with stale stamp"
            );
        }
    }

    fn reload_target(&self) -> Requirement {
        if self.reload_capable {
            Requirement::Reload
        } else {
            Requirement::Restart
        }
    }

    fn flag(&self, requirement: Requirement) -> &StampedFlag {
        match requirement {
            Requirement::Restart => &self.restart_required,
            Requirement::Reload => &self.reload_required,
        }
    }

    fn strongest_requirement(&self) -> Option<Requirement> {
        Requirement::PRECEDENCE
            .into_iter()
            .find(|requirement| self.flag(*requirement).is_active())
    }

    fn display_for(&self, phase: ProcessPhase) -> DisplayState {
        DisplayState::derive(phase, self.strongest_requirement())
    }

    fn lock_phase(&self) -> MutexGuard<'_, ProcessPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one write under the phase lock and publish the resulting change
    fn write<R>(&self, mutate: impl FnOnce(&mut ProcessPhase) -> R) -> R {
        let (result, changed) = {
            let mut phase = self.lock_phase();
            let old = self.display_for(*phase);
            let result = mutate(&mut phase);
            let new = self.display_for(*phase);

            if old == new {
                (result, false)
            } else {
                info!(process = %self.name, from = %old, to = %new, "Process state changed");
                self.notifications
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pending
                    .push_back((old, new));
                (result, true)
            }
        };

        if changed {
            self.deliver_pending();
        }
        result
    }

    /// Drain the notification queue unless another thread is already doing so
    fn deliver_pending(&self) {
        {
            let mut queue = self
                .notifications
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if queue.delivering {
                return;
            }
            queue.delivering = true;
        }

        let _guard = DeliveryGuard {
            queue: &self.notifications,
        };

        loop {
            let (old, new) = {
                let mut queue = self
                    .notifications
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                match queue.pending.pop_front() {
                    Some(change) => change,
                    None => {
                        queue.delivering = false;
                        return;
                    }
                }
            };

            let listeners: Vec<Arc<dyn StateListener>> = self
                .listeners
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect();

            for listener in listeners {
                listener.state_changed(old, new);
            }
        }
    }
}

impl std::fmt::Debug for ProcessStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessStateMachine")
            .field("name", &self.name)
            .field("reload_capable", &self.reload_capable)
            .field("state", &self.get_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn running(reload_capable: bool) -> ProcessStateMachine {
        let machine = ProcessStateMachine::new("test", reload_capable);
        machine.set_running();
        machine
    }

    fn recorder(machine: &ProcessStateMachine) -> Arc<Mutex<Vec<(DisplayState, DisplayState)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        machine.subscribe(Arc::new(move |old: DisplayState, new: DisplayState| {
            sink.lock().unwrap().push((old, new));
        }));
        seen
    }

    #[test]
    fn test_initial_state_is_starting() {
        let machine = ProcessStateMachine::new("test", true);
        assert_eq!(machine.get_state(), DisplayState::Starting);
        assert_eq!(machine.phase(), ProcessPhase::Starting);
    }

    #[test]
    fn test_phase_transitions() {
        let machine = ProcessStateMachine::new("test", true);
        machine.set_running();
        assert_eq!(machine.get_state(), DisplayState::Running);
        machine.set_stopping();
        assert_eq!(machine.get_state(), DisplayState::Stopping);
        machine.set_stopped();
        assert_eq!(machine.get_state(), DisplayState::Stopped);
        machine.set_starting();
        assert_eq!(machine.get_state(), DisplayState::Starting);
    }

    #[test]
    fn test_restart_takes_precedence_regardless_of_order() {
        let reload_first = running(true);
        reload_first.set_reload_required();
        assert_eq!(reload_first.get_state(), DisplayState::ReloadRequired);
        reload_first.set_restart_required();
        assert_eq!(reload_first.get_state(), DisplayState::RestartRequired);

        let restart_first = running(true);
        restart_first.set_restart_required();
        restart_first.set_reload_required();
        assert_eq!(restart_first.get_state(), DisplayState::RestartRequired);
    }

    #[test]
    fn test_restart_required_survives_reload_cycle() {
        let machine = running(true);
        machine.set_restart_required();

        machine.set_stopping();
        machine.set_starting();
        machine.set_running();

        assert_eq!(machine.get_state(), DisplayState::RestartRequired);
    }

    #[test]
    fn test_set_running_while_required_keeps_requirement() {
        let machine = running(true);
        machine.set_reload_required();
        machine.set_running();
        assert_eq!(machine.get_state(), DisplayState::ReloadRequired);
    }

    #[test]
    fn test_stamped_revert_clears_requirement() {
        let machine = ProcessStateMachine::new("test", true);
        let stamp = machine.set_restart_required();
        assert_eq!(machine.get_state(), DisplayState::Starting);

        machine.set_running();
        assert_eq!(machine.get_state(), DisplayState::RestartRequired);

        machine.revert_restart_required(stamp);
        assert_eq!(machine.get_state(), DisplayState::Running);
    }

    #[test]
    fn test_revert_with_superseded_stamp_is_ignored() {
        let machine = running(true);
        let stale = machine.set_restart_required();
        machine.revert_restart_required(stale);

        // Another party re-arms the flag, which bumps the stamp
        let fresh = machine.set_restart_required();
        assert_ne!(stale, fresh);

        machine.revert_restart_required(stale);
        assert_eq!(machine.get_state(), DisplayState::RestartRequired);

        machine.revert_restart_required(fresh);
        assert_eq!(machine.get_state(), DisplayState::Running);
    }

    #[test]
    fn test_reload_incapable_promotes_to_restart() {
        let machine = ProcessStateMachine::new("test", false);
        machine.set_starting();
        let stamp = machine.set_reload_required();
        machine.set_running();
        assert_eq!(machine.get_state(), DisplayState::RestartRequired);
        assert!(machine.is_required(Requirement::Restart));
        assert!(!machine.is_required(Requirement::Reload));

        machine.revert_reload_required(stamp);
        assert_eq!(machine.get_state(), DisplayState::Running);
    }

    #[test]
    fn test_idempotent_activation_needs_single_revert() {
        let machine = running(true);
        let first = machine.set_restart_required();
        let second = machine.set_restart_required();
        assert_eq!(first, second);

        machine.revert_restart_required(first);
        assert_eq!(machine.get_state(), DisplayState::Running);
    }

    #[test]
    fn test_revert_reload_leaves_restart() {
        let machine = running(true);
        machine.set_restart_required();
        let reload = machine.set_reload_required();

        machine.revert_reload_required(reload);
        assert_eq!(machine.get_state(), DisplayState::RestartRequired);
        assert!(!machine.is_required(Requirement::Reload));
    }

    #[test]
    fn test_listener_sees_changes_only() {
        let machine = ProcessStateMachine::new("test", true);
        let seen = recorder(&machine);

        machine.set_running();
        machine.set_running();
        machine.set_stopping();
        machine.set_starting();
        // Invisible while starting
        machine.set_restart_required();
        machine.set_running();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (DisplayState::Starting, DisplayState::Running),
                (DisplayState::Running, DisplayState::Stopping),
                (DisplayState::Stopping, DisplayState::Starting),
                (DisplayState::Starting, DisplayState::RestartRequired),
            ]
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let machine = ProcessStateMachine::new("test", true);
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let id = machine.subscribe(Arc::new(move |_: DisplayState, _: DisplayState| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        machine.set_running();
        assert!(machine.unsubscribe(id));
        assert!(!machine.unsubscribe(id));
        machine.set_stopping();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_reenter() {
        let machine = Arc::new(ProcessStateMachine::new("test", true));
        let inner = Arc::downgrade(&machine);
        machine.subscribe(Arc::new(move |_: DisplayState, new: DisplayState| {
            if new == DisplayState::Running {
                if let Some(machine) = inner.upgrade() {
                    machine.set_reload_required();
                }
            }
        }));
        let seen = recorder(&machine);

        machine.set_running();

        assert_eq!(machine.get_state(), DisplayState::ReloadRequired);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (DisplayState::Starting, DisplayState::Running),
                (DisplayState::Running, DisplayState::ReloadRequired),
            ]
        );
    }

    #[test]
    fn test_write_during_delivery_is_delivered_by_the_deliverer() {
        let machine = Arc::new(ProcessStateMachine::new("test", true));
        let seen = recorder(&machine);
        let seen_at_return = Arc::new(Mutex::new(None));

        let inner = Arc::downgrade(&machine);
        let log = seen.clone();
        let snapshot = seen_at_return.clone();
        machine.subscribe(Arc::new(move |_: DisplayState, new: DisplayState| {
            if new == DisplayState::Running {
                if let Some(machine) = inner.upgrade() {
                    machine.set_restart_required();
                    *snapshot.lock().unwrap() = Some(log.lock().unwrap().len());
                }
            }
        }));

        machine.set_running();

        // The nested write returned with only the outer change delivered
        assert_eq!(*seen_at_return.lock().unwrap(), Some(1));
        // The outer writer delivered both before returning
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (DisplayState::Starting, DisplayState::Running),
                (DisplayState::Running, DisplayState::RestartRequired),
            ]
        );
    }

    #[test]
    fn test_notifications_chain_under_concurrent_writers() {
        let machine = Arc::new(ProcessStateMachine::new("test", true));
        machine.set_running();
        let seen = recorder(&machine);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let machine = machine.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            let stamp = machine.set_restart_required();
                            machine.revert_restart_required(stamp);
                        } else {
                            let stamp = machine.set_reload_required();
                            machine.revert_reload_required(stamp);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Every notification starts where the previous one ended
        let seen = seen.lock().unwrap();
        for pair in seen.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        if let Some(last) = seen.last() {
            assert_eq!(last.1, machine.get_state());
        }
    }
}
