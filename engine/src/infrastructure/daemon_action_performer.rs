//! Daemon Action Performer
//! ActionPerformer adapter that hands reloads and exits to the daemon's main loop

use crate::domain::ports::{ActionPerformer, ReloadOptions};
use crate::domain::{DomainError, ExitDisposition};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A reload for the daemon loop to carry out
#[derive(Debug)]
pub struct ReloadRequest {
    pub options: ReloadOptions,
    pub reply: oneshot::Sender<Result<(), DomainError>>,
}

/// Performer that never terminates the process itself
///
/// `exit` records the disposition and cancels the shutdown token the daemon
/// waits on; the daemon exits with the disposition's code. `reload` forwards
/// a request to the daemon loop and waits for its answer.
#[derive(Debug)]
pub struct DaemonActionPerformer {
    shutdown: CancellationToken,
    disposition: Mutex<Option<ExitDisposition>>,
    reloads: mpsc::UnboundedSender<ReloadRequest>,
}

impl DaemonActionPerformer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReloadRequest>) {
        let (reloads, requests) = mpsc::unbounded_channel();
        let performer = Self {
            shutdown: CancellationToken::new(),
            disposition: Mutex::new(None),
            reloads,
        };
        (performer, requests)
    }

    /// Cancelled once an exit has been requested
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn disposition(&self) -> Option<ExitDisposition> {
        *self.disposition.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ActionPerformer for DaemonActionPerformer {
    async fn reload(&self, options: &ReloadOptions) -> Result<(), DomainError> {
        let (reply, answer) = oneshot::channel();
        self.reloads
            .send(ReloadRequest {
                options: *options,
                reply,
            })
            .map_err(|_| DomainError::ReloadFailed("reload handler is not running".to_string()))?;

        answer
            .await
            .map_err(|_| DomainError::ReloadFailed("reload handler dropped the request".to_string()))?
    }

    async fn exit(&self, disposition: ExitDisposition) -> Result<(), DomainError> {
        info!(
            disposition = %disposition,
            exit_code = disposition.exit_code(),
            "Exit requested"
        );
        *self.disposition.lock().unwrap_or_else(PoisonError::into_inner) = Some(disposition);
        self.shutdown.cancel();
        Ok(())
    }
}
