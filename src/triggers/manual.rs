//! # Externally driven trigger.
//!
//! [`ManualTrigger`] has no firing loop: the application calls
//! [`fire`](ManualTrigger::fire) itself, from as many tasks as it likes, and
//! ends the trigger with [`finish`](ManualTrigger::finish) or
//! [`fail`](ManualTrigger::fail).
//!
//! ## Example
//! ```no_run
//! # async fn demo() {
//! use std::sync::Arc;
//! use taskfire::{ExecutionManager, ExecutorContext, ManualTrigger, WorkError};
//!
//! let trigger = Arc::new(ManualTrigger::<u32>::new());
//! let manager = ExecutionManager::from_fn_with_trigger(
//!     Arc::clone(&trigger),
//!     |ctx: ExecutorContext<u32>| async move {
//!         let _job = ctx.args();
//!         Ok::<_, WorkError>(())
//!     },
//! );
//!
//! let runner = tokio::spawn({
//!     let manager = manager.clone();
//!     async move { manager.run().await }
//! });
//! trigger.started().await;
//! trigger.fire(Some(7)).await;
//! trigger.finish();
//! let _summary = runner.await;
//! # }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::core::{ExecutionState, FireHandle, FireOutcome};
use crate::error::TriggerError;
use crate::triggers::Trigger;

struct ManualState<A: Send + Sync + 'static> {
    state: ExecutionState,
    handle: Option<FireHandle<A>>,
    error: Option<TriggerError>,
}

/// Trigger fired by application code.
pub struct ManualTrigger<A: Send + Sync + 'static> {
    inner: Mutex<ManualState<A>>,
    started: Notify,
}

impl<A: Send + Sync + 'static> ManualTrigger<A> {
    /// Creates the trigger.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManualState {
                state: ExecutionState::NotStarted,
                handle: None,
                error: None,
            }),
            started: Notify::new(),
        }
    }

    /// Resolves once the manager started (or already stopped) the trigger.
    pub async fn started(&self) {
        loop {
            let notified = self.started.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.lock().state != ExecutionState::NotStarted {
                return;
            }
            notified.await;
        }
    }

    /// Fires the manager and waits for the executor to stop.
    ///
    /// Returns [`FireOutcome::Ignored`] unless the trigger is running.
    pub async fn fire(&self, args: Option<A>) -> FireOutcome {
        let handle = {
            let inner = self.lock();
            if inner.state != ExecutionState::Running {
                return FireOutcome::Ignored;
            }
            inner.handle.clone()
        };
        match handle {
            Some(handle) => handle.fire(args).await,
            None => FireOutcome::Ignored,
        }
    }

    /// Ends the trigger; the manager stops with `TriggerStop`.
    pub fn finish(&self) {
        self.end(None);
    }

    /// Ends the trigger with an error; the manager stops with `TriggerException`.
    pub fn fail(&self, error: TriggerError) {
        self.end(Some(error));
    }

    fn end(&self, error: Option<TriggerError>) {
        let handle = {
            let mut inner = self.lock();
            if !ExecutionState::advance(&mut inner.state, ExecutionState::Stopped) {
                return;
            }
            inner.error = error.clone();
            inner.handle.take()
        };
        if let Some(handle) = handle {
            handle.trigger_stopped(error);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState<A>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Send + Sync + 'static> Default for ManualTrigger<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A: Send + Sync + 'static> Trigger<A> for ManualTrigger<A> {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn start(&self, handle: FireHandle<A>) -> Result<(), TriggerError> {
        {
            let mut inner = self.lock();
            if inner.state != ExecutionState::NotStarted {
                return Err(TriggerError::Start {
                    error: format!("manual trigger cannot start from {:?}", inner.state),
                });
            }
            inner.state = ExecutionState::Running;
            inner.handle = Some(handle);
        }
        self.started.notify_waiters();
        Ok(())
    }

    async fn stop_execution(&self, _wait: bool) {
        {
            let mut inner = self.lock();
            ExecutionState::advance(&mut inner.state, ExecutionState::Stopped);
            inner.handle = None;
        }
        self.started.notify_waiters();
    }

    fn state(&self) -> ExecutionState {
        self.lock().state
    }

    fn error(&self) -> Option<TriggerError> {
        self.lock().error.clone()
    }
}
