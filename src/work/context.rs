//! # Executor context handed to user work.
//!
//! [`ExecutorContext`] is a cheap clone of the owning executor's handle. Work
//! uses it to:
//! - read the pass-through args and the shared property bag,
//! - observe cooperative cancellation (`is_stop_requested`, `cancelled`),
//! - raise stop signals (`stop`, `stop_manager`),
//! - spawn background work the executor waits for before finalizing.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::{Executor, ExecutorId, StopScope};
use crate::error::{WorkError, panic_message};
use crate::phases::Properties;

/// Handle to the running executor.
pub struct ExecutorContext<A> {
    executor: Arc<Executor<A>>,
}

impl<A> Clone for ExecutorContext<A> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<A: Send + Sync + 'static> ExecutorContext<A> {
    pub(crate) fn new(executor: Arc<Executor<A>>) -> Self {
        Self { executor }
    }

    /// Identity of the executor.
    pub fn id(&self) -> ExecutorId {
        self.executor.id()
    }

    /// The executor itself.
    pub fn executor(&self) -> &Arc<Executor<A>> {
        &self.executor
    }

    /// Pass-through arguments of this firing.
    pub fn args(&self) -> Option<&A> {
        self.executor.args()
    }

    /// Executor-wide property bag, shared by every phase.
    pub fn properties(&self) -> &Properties {
        self.executor.properties()
    }

    /// Returns `true` once the executor was asked to stop.
    pub fn is_stop_requested(&self) -> bool {
        self.executor.is_stop_requested()
    }

    /// Token cancelled when the executor is asked to stop from outside
    /// (manager drain) or when it finalizes.
    pub fn token(&self) -> &CancellationToken {
        self.executor.token()
    }

    /// Resolves when [`token`](Self::token) is cancelled.
    pub async fn cancelled(&self) {
        self.executor.token().cancelled().await
    }

    /// Builds the signal that stops this executor.
    ///
    /// Return it as the error of the current call; `?` carries it up from
    /// any depth. `cause` becomes the executor's error and makes the verdict
    /// `Unsuccessful`.
    pub fn stop(&self, cause: Option<WorkError>) -> WorkError {
        self.signal(StopScope::Executor, cause)
    }

    /// Builds the signal that stops this executor and its manager.
    pub fn stop_manager(&self, cause: Option<WorkError>) -> WorkError {
        self.signal(StopScope::Manager, cause)
    }

    fn signal(&self, scope: StopScope, cause: Option<WorkError>) -> WorkError {
        // Mark right away so parallel siblings stop claiming items.
        self.executor.signal_stop(scope);
        WorkError::Stop {
            scope,
            cause: cause.map(Arc::new),
        }
    }

    /// Spawns background work counted as in-flight for this executor.
    ///
    /// Finalization waits for it. A returned stop signal is applied to the
    /// executor and its cause, if any, fills an empty error slot; other
    /// errors and panics are logged.
    pub fn spawn_tracked<F>(&self, fut: F) -> JoinHandle<Result<(), WorkError>>
    where
        F: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        let guard = self.executor.depth().enter();
        let executor = Arc::clone(&self.executor);

        tokio::spawn(async move {
            let _guard = guard;
            let res = AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(WorkError::Panicked {
                        info: panic_message(&*panic),
                    })
                });

            match &res {
                Err(WorkError::Stop { scope, cause }) => {
                    executor.signal_stop(*scope);
                    if let Some(cause) = cause {
                        executor.record_late_error(Arc::clone(cause));
                    }
                }
                Err(e) => tracing::warn!(
                    executor = %executor.id(),
                    error = %e,
                    label = e.as_label(),
                    "tracked work failed"
                ),
                Ok(()) => {}
            }
            res
        })
    }
}

impl<A: 'static> std::fmt::Debug for ExecutorContext<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorContext")
            .field("executor", &self.executor.id())
            .finish()
    }
}
