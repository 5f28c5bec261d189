//! Concurrent Fan-out Executor
//!
//! Runs a batch of independent tasks on the shared runtime and waits for all
//! of them. Waiting starts patient, blocking on each handle in submission
//! order. Once the wait is interrupted or a task fails, the remaining handles
//! are only polled: finished ones land normally, the rest are cancelled.

use crate::domain::DomainError;
use std::future::Future;
use std::pin::Pin;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A boxed unit of work submitted as part of a batch
pub type BatchTask<T> = Pin<Box<dyn Future<Output = Result<T, DomainError>> + Send>>;

/// Ordered list of independent tasks submitted together
pub struct ConcurrentBatch<T> {
    tasks: Vec<(String, BatchTask<T>)>,
}

impl<T: Send + 'static> ConcurrentBatch<T> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Append a named task; the name identifies it in logs and reports
    pub fn push<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<T, DomainError>> + Send + 'static,
    {
        self.tasks.push((name.into(), Box::pin(task)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T: Send + 'static> Default for ConcurrentBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a single task of a batch ended
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Completed(T),
    Failed(DomainError),
    /// Abandoned after the waiter turned impatient
    Cancelled,
}

impl<T> TaskOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }
}

#[derive(Debug, Clone)]
pub struct TaskReport<T> {
    pub name: String,
    pub outcome: TaskOutcome<T>,
}

/// Per-task outcomes in submission order
#[derive(Debug, Clone)]
pub struct FanoutReport<T> {
    pub tasks: Vec<TaskReport<T>>,
    /// Set when the waiter stopped waiting patiently, because of an
    /// interruption or a failed task
    pub interrupted: bool,
}

impl<T> FanoutReport<T> {
    pub fn all_completed(&self) -> bool {
        self.tasks.iter().all(|task| task.outcome.is_completed())
    }

    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome<T>> {
        self.tasks
            .iter()
            .find(|task| task.name == name)
            .map(|task| &task.outcome)
    }
}

pub struct ConcurrentFanoutExecutor {
    runtime: Handle,
}

impl ConcurrentFanoutExecutor {
    /// Create an executor that spawns onto the given runtime
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Create an executor on the runtime of the calling task
    ///
    /// Panics when called outside a tokio runtime, as `Handle::current` does.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Run every task of the batch concurrently and wait for all of them
    ///
    /// `interrupt` is the caller's cancellation token. If it fires while
    /// waiting, or a task fails, the remaining tasks are cancelled unless
    /// already finished, and the token is left cancelled on return so the
    /// caller observes the interruption.
    pub async fn run<T>(
        &self,
        batch: ConcurrentBatch<T>,
        interrupt: &CancellationToken,
    ) -> FanoutReport<T>
    where
        T: Send + 'static,
    {
        let handles: Vec<(String, JoinHandle<Result<T, DomainError>>)> = batch
            .tasks
            .into_iter()
            .map(|(name, task)| (name, self.runtime.spawn(task)))
            .collect();

        debug!(tasks = handles.len(), "Submitted concurrent batch");

        let mut impatient = false;
        let mut reports = Vec::with_capacity(handles.len());

        for (name, mut handle) in handles {
            let outcome = if impatient {
                Self::poll_or_cancel(&name, handle).await
            } else {
                tokio::select! {
                    biased;
                    joined = &mut handle => Self::outcome_of(&name, joined),
                    _ = interrupt.cancelled() => {
                        warn!(
                            task = %name,
                            "Interrupted while waiting for task, cancelling unfinished tasks"
                        );
                        impatient = true;
                        Self::poll_or_cancel(&name, handle).await
                    }
                }
            };

            if let TaskOutcome::Failed(ref error) = outcome {
                if !impatient {
                    warn!(
                        task = %name,
                        error = %error,
                        "Task failed, cancelling unfinished tasks"
                    );
                    impatient = true;
                }
            }

            reports.push(TaskReport { name, outcome });
        }

        if impatient {
            interrupt.cancel();
        } else {
            info!(tasks = reports.len(), "Concurrent batch completed");
        }

        FanoutReport {
            tasks: reports,
            interrupted: impatient,
        }
    }

    async fn poll_or_cancel<T>(
        name: &str,
        handle: JoinHandle<Result<T, DomainError>>,
    ) -> TaskOutcome<T> {
        if handle.is_finished() {
            Self::outcome_of(name, handle.await)
        } else {
            debug!(task = %name, "Cancelling unfinished task");
            handle.abort();
            TaskOutcome::Cancelled
        }
    }

    fn outcome_of<T>(name: &str, joined: Result<Result<T, DomainError>, JoinError>) -> TaskOutcome<T> {
        match joined {
            Ok(Ok(value)) => TaskOutcome::Completed(value),
            Ok(Err(error)) => {
                warn!(task = %name, error = %error, "Task failed");
                TaskOutcome::Failed(error)
            }
            Err(join_error) if join_error.is_cancelled() => TaskOutcome::Cancelled,
            Err(_) => {
                warn!(task = %name, "Task panicked");
                TaskOutcome::Failed(DomainError::TaskPanicked(name.to_string()))
            }
        }
    }
}
