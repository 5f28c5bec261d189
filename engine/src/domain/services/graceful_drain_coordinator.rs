//! Graceful Drain Coordinator
//!
//! Drives one disruptive action (reload or shutdown) through the admission
//! controller: request suspension, wait for it asynchronously, then perform
//! the action. A timeout still performs the action; a cancelled suspension
//! abandons it and leaves the process phase untouched.

use crate::constants::drain::DEFAULT_INSTALLATION_LOCK_TIMEOUT_SEC;
use crate::domain::ports::{
    ActionPerformer, InstallationManager, ReloadOptions, SuspendController, SuspendListener,
};
use crate::domain::services::ProcessStateMachine;
use crate::domain::{DomainError, ExitDisposition, SuspendState, SuspendTimeout};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// The disruptive action a drain ends with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainAction {
    Reload(ReloadOptions),
    Shutdown {
        restart: bool,
        perform_installation: bool,
    },
}

impl fmt::Display for DrainAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainAction::Reload(_) => write!(f, "reload"),
            DrainAction::Shutdown { restart: true, .. } => write!(f, "restart"),
            DrainAction::Shutdown { restart: false, .. } => write!(f, "shutdown"),
        }
    }
}

/// Progress of a single drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPhase {
    #[default]
    Idle,
    SuspendRequested,
    Suspended,
    Cancelled,
    TimedOut,
    ActionPerformed,
}

/// Why the action went ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainTrigger {
    AlreadySuspended,
    Suspended,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrainOutcome {
    Performed {
        trigger: DrainTrigger,
        /// Set for shutdowns
        disposition: Option<ExitDisposition>,
    },
    /// The suspension was cancelled before it completed
    Abandoned,
    Failed(DomainError),
}

impl DrainOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, DrainOutcome::Performed { .. })
    }
}

/// Handle to a drain in progress
pub struct DrainTicket {
    outcome: oneshot::Receiver<DrainOutcome>,
    phase: watch::Receiver<DrainPhase>,
}

impl DrainTicket {
    pub fn phase(&self) -> DrainPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<DrainPhase> {
        self.phase.clone()
    }

    /// Wait for the drain to finish
    pub async fn wait(self) -> DrainOutcome {
        // The sender only goes away without a value if the runtime shuts down
        self.outcome.await.unwrap_or(DrainOutcome::Abandoned)
    }
}

enum DrainSignal {
    Complete,
    Cancelled,
    TimedOut,
}

/// Forwards suspend callbacks to the drain task
struct DrainListener {
    signals: mpsc::UnboundedSender<DrainSignal>,
}

impl SuspendListener for DrainListener {
    fn suspend_started(&self) {
        debug!("Suspend started");
    }

    fn complete(&self) {
        let _ = self.signals.send(DrainSignal::Complete);
    }

    fn cancelled(&self) {
        let _ = self.signals.send(DrainSignal::Cancelled);
    }

    fn timeout(&self) {
        let _ = self.signals.send(DrainSignal::TimedOut);
    }
}

#[derive(Clone)]
pub struct GracefulDrainCoordinator {
    process: Arc<ProcessStateMachine>,
    suspend: Arc<dyn SuspendController>,
    performer: Arc<dyn ActionPerformer>,
    installation: Option<Arc<dyn InstallationManager>>,
    installation_lock_timeout: Duration,
}

impl GracefulDrainCoordinator {
    pub fn new(
        process: Arc<ProcessStateMachine>,
        suspend: Arc<dyn SuspendController>,
        performer: Arc<dyn ActionPerformer>,
    ) -> Self {
        Self {
            process,
            suspend,
            performer,
            installation: None,
            installation_lock_timeout: Duration::from_secs(DEFAULT_INSTALLATION_LOCK_TIMEOUT_SEC),
        }
    }

    pub fn with_installation(mut self, installation: Arc<dyn InstallationManager>) -> Self {
        self.installation = Some(installation);
        self
    }

    /// How long a shutdown waits for the installation lock before degrading
    /// to a plain restart
    pub fn with_installation_lock_timeout(mut self, timeout: Duration) -> Self {
        self.installation_lock_timeout = timeout;
        self
    }

    /// Start draining for `action`
    ///
    /// Returns once the suspend request has been issued; the action runs on
    /// a background task when the suspension completes or times out. Must be
    /// called from within a tokio runtime.
    pub fn start(&self, action: DrainAction, timeout: SuspendTimeout) -> DrainTicket {
        let (phase_tx, phase_rx) = watch::channel(DrainPhase::Idle);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let coordinator = self.clone();

        if self.suspend.state() == SuspendState::Suspended {
            info!(process = %self.process.name(), action = %action, "Already suspended, performing action");
            phase_tx.send_replace(DrainPhase::Suspended);
            tokio::spawn(async move {
                let outcome = coordinator
                    .perform(action, DrainTrigger::AlreadySuspended, &phase_tx)
                    .await;
                let _ = outcome_tx.send(outcome);
            });
        } else {
            let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
            let listener = self
                .suspend
                .add_listener(Arc::new(DrainListener { signals: signal_tx }));
            phase_tx.send_replace(DrainPhase::SuspendRequested);

            info!(
                process = %self.process.name(),
                action = %action,
                timeout_ms = timeout.as_millis(),
                "Requesting suspend"
            );
            self.suspend.suspend(timeout);

            tokio::spawn(async move {
                let signal = signal_rx.recv().await;
                coordinator.suspend.remove_listener(listener);

                let outcome = match signal {
                    Some(DrainSignal::Complete) => {
                        phase_tx.send_replace(DrainPhase::Suspended);
                        coordinator
                            .perform(action, DrainTrigger::Suspended, &phase_tx)
                            .await
                    }
                    Some(DrainSignal::TimedOut) => {
                        warn!(
                            process = %coordinator.process.name(),
                            action = %action,
                            "Suspend timed out with requests in flight, proceeding anyway"
                        );
                        phase_tx.send_replace(DrainPhase::TimedOut);
                        coordinator
                            .perform(action, DrainTrigger::TimedOut, &phase_tx)
                            .await
                    }
                    Some(DrainSignal::Cancelled) | None => {
                        info!(
                            process = %coordinator.process.name(),
                            action = %action,
                            "Suspend cancelled, abandoning action"
                        );
                        phase_tx.send_replace(DrainPhase::Cancelled);
                        DrainOutcome::Abandoned
                    }
                };
                let _ = outcome_tx.send(outcome);
            });
        }

        DrainTicket {
            outcome: outcome_rx,
            phase: phase_rx,
        }
    }

    /// Start draining and wait for the outcome
    pub async fn run(&self, action: DrainAction, timeout: SuspendTimeout) -> DrainOutcome {
        self.start(action, timeout).wait().await
    }

    async fn perform(
        &self,
        action: DrainAction,
        trigger: DrainTrigger,
        phase: &watch::Sender<DrainPhase>,
    ) -> DrainOutcome {
        let outcome = match action {
            DrainAction::Reload(options) => self.reload(&options, trigger).await,
            DrainAction::Shutdown {
                restart,
                perform_installation,
            } => self.shutdown(restart, perform_installation, trigger).await,
        };
        phase.send_replace(DrainPhase::ActionPerformed);
        outcome
    }

    async fn reload(&self, options: &ReloadOptions, trigger: DrainTrigger) -> DrainOutcome {
        self.process.set_stopping();
        match self.performer.reload(options).await {
            Ok(()) => {
                self.process.set_starting();
                self.process.set_running();
                self.suspend.resume();
                info!(process = %self.process.name(), "Reload completed");
                DrainOutcome::Performed {
                    trigger,
                    disposition: None,
                }
            }
            Err(e) => {
                error!(process = %self.process.name(), error = %e, "Reload failed");
                self.process.set_stopped();
                DrainOutcome::Failed(e)
            }
        }
    }

    async fn shutdown(
        &self,
        restart: bool,
        perform_installation: bool,
        trigger: DrainTrigger,
    ) -> DrainOutcome {
        self.process.set_stopping();
        let disposition = self.resolve_disposition(restart, perform_installation).await;

        if let Err(e) = self.performer.exit(disposition).await {
            error!(process = %self.process.name(), error = %e, "Exit request failed");
            self.process.set_stopped();
            return DrainOutcome::Failed(e);
        }

        self.process.set_stopped();
        info!(
            process = %self.process.name(),
            disposition = %disposition,
            exit_code = disposition.exit_code(),
            "Process stopped"
        );
        DrainOutcome::Performed {
            trigger,
            disposition: Some(disposition),
        }
    }

    async fn resolve_disposition(&self, restart: bool, perform_installation: bool) -> ExitDisposition {
        if !perform_installation {
            return if restart {
                ExitDisposition::RestartFromLauncher
            } else {
                ExitDisposition::Normal
            };
        }

        let Some(installation) = &self.installation else {
            warn!("No installation manager configured, restarting without installation");
            return ExitDisposition::RestartFromLauncher;
        };

        match tokio::time::timeout(
            self.installation_lock_timeout,
            installation.wait_for_client_release(),
        )
        .await
        {
            Ok(Ok(())) => ExitDisposition::RestartWithPendingInstallation,
            Ok(Err(e)) => {
                warn!(error = %e, "Installation lock wait failed, restarting without installation");
                ExitDisposition::RestartFromLauncher
            }
            Err(_) => {
                warn!(
                    timeout_sec = self.installation_lock_timeout.as_secs(),
                    "Timed out waiting for installation lock, restarting without installation"
                );
                ExitDisposition::RestartFromLauncher
            }
        }
    }
}

impl fmt::Debug for GracefulDrainCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GracefulDrainCoordinator")
            .field("process", &self.process.name())
            .field("installation", &self.installation.is_some())
            .field("installation_lock_timeout", &self.installation_lock_timeout)
            .finish()
    }
}
