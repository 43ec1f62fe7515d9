//! A set of tasks sharing one cancellation scope
//!
//! The first task to fail records its error and cancels the scope. `wait`
//! joins every task before returning that first error, so consumers still
//! get to drain what was already queued.

use crate::error::{BuildError, BuildResult};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type ErrorSlot = Arc<Mutex<Option<BuildError>>>;

/// Structured-concurrency task set
pub struct TaskGroup {
    tasks: JoinSet<()>,
    token: CancellationToken,
    first_error: ErrorSlot,
}

impl TaskGroup {
    /// Create a group whose scope is cancelled when `parent` is
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            token: parent.child_token(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// The shared cancellation scope
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn an async task in the group
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = BuildResult<()>> + Send + 'static,
    {
        let token = self.token.clone();
        let slot = self.first_error.clone();
        self.tasks.spawn(async move {
            if let Err(e) = task.await {
                fail(&slot, &token, name, e);
            }
        });
    }

    /// Spawn a blocking task in the group
    pub fn spawn_blocking<F>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce() -> BuildResult<()> + Send + 'static,
    {
        let token = self.token.clone();
        let slot = self.first_error.clone();
        self.tasks.spawn_blocking(move || {
            if let Err(e) = task() {
                fail(&slot, &token, name, e);
            }
        });
    }

    /// Wait for every task, then return the first recorded failure
    pub async fn wait(mut self) -> BuildResult<()> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                let err = BuildError::Internal(format!("task failed to complete: {}", e));
                fail(&self.first_error, &self.token, "join", err);
            }
        }

        let first = match self.first_error.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn fail(slot: &ErrorSlot, token: &CancellationToken, name: &str, err: BuildError) {
    debug!("{} task failed: {}", name, err);
    let mut guard = match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if guard.is_none() {
        *guard = Some(err);
    }
    token.cancel();
}
