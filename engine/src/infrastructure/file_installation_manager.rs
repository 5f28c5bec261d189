//! File-based Installation Manager
//! Implementation of the InstallationManager port over marker files

use crate::constants::drain::INSTALLATION_LOCK_POLL_MS;
use crate::constants::installation::{CLIENT_LOCK, PENDING_MARKER};
use crate::domain::ports::InstallationManager;
use crate::domain::DomainError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Installation state kept in a directory
///
/// A staged installation is marked by `<dir>/pending`. The companion client
/// holds `<dir>/client.lock` while it uses the installation; waiting for
/// release polls until that file is gone.
#[derive(Debug, Clone)]
pub struct FileInstallationManager {
    dir: PathBuf,
    poll_interval: Duration,
}

impl FileInstallationManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: Duration::from_millis(INSTALLATION_LOCK_POLL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(CLIENT_LOCK)
    }

    async fn lock_held(&self) -> Result<bool, DomainError> {
        match tokio::fs::metadata(self.lock_path()).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::InstallationLock(format!(
                "cannot read {}: {}",
                self.lock_path().display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl InstallationManager for FileInstallationManager {
    fn installation_pending(&self) -> bool {
        self.dir.join(PENDING_MARKER).is_file()
    }

    async fn wait_for_client_release(&self) -> Result<(), DomainError> {
        if !self.dir.is_dir() {
            return Err(DomainError::InstallationLock(format!(
                "installation directory {} does not exist",
                self.dir.display()
            )));
        }

        let mut logged = false;
        while self.lock_held().await? {
            if !logged {
                info!(lock = %self.lock_path().display(), "Waiting for client to release installation lock");
                logged = true;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        debug!(dir = %self.dir.display(), "Installation lock released");
        Ok(())
    }
}
