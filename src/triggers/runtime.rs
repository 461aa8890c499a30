//! Shared lifecycle for triggers that fire from their own task.
//!
//! [`TriggerRuntime::launch`] spawns the firing loop once; the loop gets a
//! [`CancellationToken`] cancelled by [`TriggerRuntime::stop`] (manager
//! drain) or [`TriggerRuntime::finish`] (the trigger decided it is done).
//! When the loop returns:
//! - the state becomes `Stopped` and waiters of `stop(true)` wake,
//! - unless the manager asked for the stop, the manager is told through
//!   `trigger_stopped`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::{ExecutionState, FireHandle};
use crate::error::TriggerError;

#[derive(Debug)]
pub(crate) struct TriggerRuntime {
    state: Mutex<ExecutionState>,
    error: Mutex<Option<TriggerError>>,
    token: CancellationToken,
    done: watch::Sender<bool>,
    stop_requested: AtomicBool,
}

impl TriggerRuntime {
    pub(crate) fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            state: Mutex::new(ExecutionState::NotStarted),
            error: Mutex::new(None),
            token: CancellationToken::new(),
            done,
            stop_requested: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> ExecutionState {
        *self.lock_state()
    }

    pub(crate) fn error(&self) -> Option<TriggerError> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Marks the trigger running and spawns `body`. Allowed once.
    pub(crate) fn launch<A, F, Fut>(
        self: &Arc<Self>,
        name: &'static str,
        handle: FireHandle<A>,
        body: F,
    ) -> Result<(), TriggerError>
    where
        A: Send + Sync + 'static,
        F: FnOnce(FireHandle<A>, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), TriggerError>> + Send + 'static,
    {
        {
            let mut state = self.lock_state();
            if *state != ExecutionState::NotStarted {
                return Err(TriggerError::Start {
                    error: format!("{name} cannot start from {:?}", *state),
                });
            }
            *state = ExecutionState::Running;
        }

        let fut = body(handle.clone(), self.token.clone());
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            let res = fut.await;
            if let Err(e) = &res {
                tracing::error!(trigger = name, error = %e, "trigger failed");
                *runtime.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e.clone());
            }
            ExecutionState::advance(&mut runtime.lock_state(), ExecutionState::Stopped);
            runtime.done.send_replace(true);
            tracing::debug!(trigger = name, "trigger stopped");

            if !runtime.stop_requested.load(Ordering::Acquire) {
                handle.trigger_stopped(res.err());
            }
        });
        Ok(())
    }

    /// Ends the firing loop on the trigger's own decision.
    pub(crate) fn finish(&self) {
        self.token.cancel();
    }

    /// Ends the firing loop on the manager's request.
    pub(crate) async fn stop(&self, wait: bool) {
        self.stop_requested.store(true, Ordering::Release);
        {
            let mut state = self.lock_state();
            match *state {
                ExecutionState::NotStarted => {
                    *state = ExecutionState::Stopped;
                    self.done.send_replace(true);
                }
                ExecutionState::Started | ExecutionState::Running => {
                    *state = ExecutionState::Stopping;
                }
                ExecutionState::Stopping | ExecutionState::Stopped => {}
            }
        }
        self.token.cancel();

        if wait {
            let mut rx = self.done.subscribe();
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ExecutionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
