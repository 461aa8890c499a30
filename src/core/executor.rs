//! # Executor: one firing's lifecycle.
//!
//! An [`Executor`] is created by the manager for every firing and runs one
//! unit of work exactly once:
//!
//! ```text
//! execute(unit)
//!   NotStarted ─► Started ─► on_started() ─► Running ─► unit.drive()
//!                     │ (error / stop)            │ (error / stop / done)
//!                     └───────────────┬───────────┘
//!                                     ▼
//! finalize:  Stopping (verdict latched) ─► cancel token ─► wait depth == 0
//!            ─► on_stopped() ─► live-map removal ─► Stopped ─► post-run callback
//! ```
//!
//! ## Rules
//! - The verdict and the captured error are latched once, at `Stopping`;
//!   later failures (from `on_stopped` or tracked work still draining) only
//!   fill an empty error slot.
//! - The stop scope is read after the drain, so tracked work can still
//!   escalate to the manager.
//! - [`result`](Executor::result) reads `Undetermined` until `Stopped`.
//! - The post-run callback runs only for `Successful` executors, after
//!   `Stopped`.
//! - Lock order is executor → manager; the live-map removal runs under the
//!   executor lock so `Stopped` and "not live" flip together.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::core::depth::DepthTracker;
use crate::core::unit::Unit;
use crate::core::{ExecutionState, ExecutorId, ExecutorResult, StopScope};
use crate::error::{EngineError, TriggerError, WorkError, panic_message};
use crate::observers::ObserverSet;
use crate::phases::{PhaseArgs, Properties};
use crate::work::ExecutorContext;

/// Callback run for a successful executor once it reached `Stopped`.
pub type PostRunCallback = Arc<dyn Fn(ExecutorId) -> Result<(), TriggerError> + Send + Sync>;

/// Callback run under the executor lock right before it becomes `Stopped`.
pub type StoppedCallback = Arc<dyn Fn(ExecutorId) + Send + Sync>;

/// Everything an executor needs from its owner. Set once by
/// [`Executor::configure`].
pub struct ExecutorBinding<A> {
    observers: Arc<ObserverSet<A>>,
    on_stopped: Option<StoppedCallback>,
    post_run: Option<PostRunCallback>,
}

impl<A> ExecutorBinding<A> {
    /// Binding that only notifies `observers`.
    pub fn new(observers: Arc<ObserverSet<A>>) -> Self {
        Self {
            observers,
            on_stopped: None,
            post_run: None,
        }
    }

    /// Sets the callback run right before the executor becomes `Stopped`.
    pub fn with_on_stopped(mut self, callback: StoppedCallback) -> Self {
        self.on_stopped = Some(callback);
        self
    }

    /// Sets the callback run after a successful executor stopped.
    pub fn with_post_run(mut self, callback: PostRunCallback) -> Self {
        self.post_run = Some(callback);
        self
    }
}

/// Point-in-time view of an executor.
#[derive(Debug, Clone)]
pub struct ExecutorSnapshot {
    /// Executor identity.
    pub id: ExecutorId,
    /// Lifecycle state.
    pub state: ExecutionState,
    /// Verdict; `Undetermined` until `Stopped`.
    pub result: ExecutorResult,
    /// Captured error, if any.
    pub error: Option<Arc<WorkError>>,
}

/// What the manager needs to know once `execute` returned.
#[derive(Debug)]
pub(crate) struct ExecutorOutcome {
    pub(crate) id: ExecutorId,
    pub(crate) result: ExecutorResult,
    pub(crate) error: Option<Arc<WorkError>>,
    pub(crate) scope: StopScope,
    pub(crate) post_run_error: Option<String>,
}

#[derive(Debug, Default)]
struct ExecutorInner {
    state: ExecutionState,
    verdict: ExecutorResult,
    error: Option<Arc<WorkError>>,
    stop_requested: bool,
    stop_scope: Option<StopScope>,
}

/// Runs one unit of work through its lifecycle.
pub struct Executor<A> {
    id: ExecutorId,
    args: Option<Arc<A>>,
    inner: Mutex<ExecutorInner>,
    depth: Arc<DepthTracker>,
    token: CancellationToken,
    properties: Properties,
    binding: OnceLock<ExecutorBinding<A>>,
}

impl<A: 'static> Executor<A> {
    /// Creates an executor carrying `args`, with its own cancellation root.
    pub fn new(args: Option<Arc<A>>) -> Self {
        Self::with_token(args, CancellationToken::new())
    }

    /// Creates an executor whose token is a child of `parent`.
    pub(crate) fn with_parent(args: Option<Arc<A>>, parent: &CancellationToken) -> Self {
        Self::with_token(args, parent.child_token())
    }

    fn with_token(args: Option<Arc<A>>, token: CancellationToken) -> Self {
        Self {
            id: ExecutorId::next(),
            args,
            inner: Mutex::new(ExecutorInner::default()),
            depth: DepthTracker::new(),
            token,
            properties: Properties::default(),
            binding: OnceLock::new(),
        }
    }

    /// Executor identity.
    pub fn id(&self) -> ExecutorId {
        self.id
    }

    /// Pass-through arguments.
    pub fn args(&self) -> Option<&A> {
        self.args.as_deref()
    }

    /// Executor-wide property bag.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecutionState {
        self.lock().state
    }

    /// Verdict; `Undetermined` until the executor is `Stopped`.
    pub fn result(&self) -> ExecutorResult {
        let inner = self.lock();
        if inner.state == ExecutionState::Stopped {
            inner.verdict
        } else {
            ExecutorResult::Undetermined
        }
    }

    /// Captured error, if any.
    pub fn error(&self) -> Option<Arc<WorkError>> {
        self.lock().error.clone()
    }

    /// Returns `true` while the executor is `Running`.
    pub fn is_running(&self) -> bool {
        self.lock().state == ExecutionState::Running
    }

    /// Returns `true` once a stop was requested or signalled.
    pub fn is_stop_requested(&self) -> bool {
        let inner = self.lock();
        inner.stop_requested || inner.state.is_stopping_or_stopped()
    }

    /// Point-in-time view.
    pub fn snapshot(&self) -> ExecutorSnapshot {
        let inner = self.lock();
        ExecutorSnapshot {
            id: self.id,
            state: inner.state,
            result: if inner.state == ExecutionState::Stopped {
                inner.verdict
            } else {
                ExecutorResult::Undetermined
            },
            error: inner.error.clone(),
        }
    }

    /// Binds observers and callbacks. Allowed once, before the executor ran.
    pub fn configure(&self, binding: ExecutorBinding<A>) -> Result<(), EngineError> {
        let state = self.state();
        if state != ExecutionState::NotStarted {
            return Err(EngineError::InvalidState {
                operation: "configure",
                reason: "executor already ran",
                state,
            });
        }
        self.binding
            .set(binding)
            .map_err(|_| EngineError::InvalidState {
                operation: "configure",
                reason: "executor already configured",
                state,
            })
    }

    /// Asks the executor to stop from outside.
    ///
    /// Items not yet claimed are skipped, the token is cancelled, in-flight
    /// work finishes cooperatively.
    pub fn request_stop(&self) {
        {
            let mut inner = self.lock();
            inner.stop_requested = true;
            if inner.state.is_active() {
                ExecutionState::advance(&mut inner.state, ExecutionState::Stopping);
            }
        }
        self.token.cancel();
    }

    /// Marks a stop raised by the executor's own work.
    ///
    /// Unlike [`request_stop`](Self::request_stop) the token stays live, so
    /// in-flight items can still finish when full execution was requested.
    pub(crate) fn signal_stop(&self, scope: StopScope) {
        let mut inner = self.lock();
        inner.stop_requested = true;
        inner.stop_scope = inner.stop_scope.max(Some(scope));
        if inner.state.is_active() {
            ExecutionState::advance(&mut inner.state, ExecutionState::Stopping);
        }
    }

    /// Fills an empty error slot after the verdict was latched.
    ///
    /// Returns `false` when an earlier error is kept.
    pub(crate) fn record_late_error(&self, error: Arc<WorkError>) -> bool {
        let mut inner = self.lock();
        if inner.error.is_some() {
            return false;
        }
        inner.error = Some(error);
        inner.verdict = ExecutorResult::Unsuccessful;
        true
    }

    pub(crate) fn depth(&self) -> &Arc<DepthTracker> {
        &self.depth
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Delivers a finished phase to the bound observers.
    pub(crate) fn observe(&self, phase: &PhaseArgs<A>) {
        if let Some(binding) = self.binding.get() {
            binding.observers.notify(phase);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ExecutorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Send + Sync + 'static> Executor<A> {
    /// Runs `unit` through the full lifecycle. Single use.
    pub(crate) async fn execute(
        self: &Arc<Self>,
        unit: &dyn Unit<A>,
    ) -> Result<ExecutorOutcome, EngineError> {
        let Some(binding) = self.binding.get() else {
            return Err(EngineError::InvalidState {
                operation: "execute",
                reason: "executor not configured",
                state: self.state(),
            });
        };
        {
            let mut inner = self.lock();
            if inner.state != ExecutionState::NotStarted {
                return Err(EngineError::InvalidState {
                    operation: "execute",
                    reason: "executor is single-use",
                    state: inner.state,
                });
            }
            inner.state = ExecutionState::Started;
        }
        tracing::debug!(executor = %self.id, "executor started");

        let ctx = ExecutorContext::new(Arc::clone(self));
        let mut stop = Interrupt::default();

        if !self.is_stop_requested() {
            let started = {
                let _depth = self.depth.enter();
                guarded(unit.on_started(&ctx)).await
            };
            if let Err(e) = started {
                tracing::warn!(executor = %self.id, error = %e, "pre-work initialization failed");
                stop.absorb(e);
            }
        }

        if stop.is_clear() && self.enter_running() {
            if let Err(e) = unit.drive(&ctx).await {
                stop.absorb(e);
            }
        }

        Ok(self.finalize(unit, &ctx, stop, binding).await)
    }

    fn enter_running(&self) -> bool {
        let mut inner = self.lock();
        if inner.stop_requested || inner.state != ExecutionState::Started {
            return false;
        }
        inner.state = ExecutionState::Running;
        true
    }

    async fn finalize(
        self: &Arc<Self>,
        unit: &dyn Unit<A>,
        ctx: &ExecutorContext<A>,
        stop: Interrupt,
        binding: &ExecutorBinding<A>,
    ) -> ExecutorOutcome {
        {
            let mut inner = self.lock();
            ExecutionState::advance(&mut inner.state, ExecutionState::Stopping);
            if inner.error.is_none() {
                inner.error = stop.cause;
            }
            inner.verdict = if inner.error.is_some() {
                ExecutorResult::Unsuccessful
            } else {
                ExecutorResult::Successful
            };
        }

        self.token.cancel();
        self.depth.wait_zero().await;

        let late = match guarded(unit.on_stopped(ctx)).await {
            Ok(()) => None,
            Err(WorkError::Stop { cause, .. }) => cause,
            Err(e) => Some(Arc::new(e)),
        };
        if let Some(error) = late {
            if !self.record_late_error(Arc::clone(&error)) {
                tracing::warn!(executor = %self.id, error = %error, "post-work hook failed after an earlier error");
            }
        }

        // Tracked work may have widened the scope while we drained.
        let (result, error, scope) = {
            let mut inner = self.lock();
            if let Some(on_stopped) = &binding.on_stopped {
                on_stopped(self.id);
            }
            inner.state = ExecutionState::Stopped;
            let scope = stop.scope.max(inner.stop_scope.unwrap_or(StopScope::Executor));
            (inner.verdict, inner.error.clone(), scope)
        };
        tracing::debug!(executor = %self.id, result = ?result, "executor stopped");

        let mut post_run_error = None;
        if result == ExecutorResult::Successful {
            if let Some(post_run) = &binding.post_run {
                post_run_error = match catch_unwind(AssertUnwindSafe(|| post_run(self.id))) {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(panic) => Some(panic_message(&*panic)),
                };
            }
        }
        if let Some(e) = &post_run_error {
            tracing::error!(executor = %self.id, error = %e, "post-run callback failed");
        }

        ExecutorOutcome {
            id: self.id,
            result,
            error,
            scope,
            post_run_error,
        }
    }
}

impl<A: 'static> fmt::Debug for Executor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Executor")
            .field("id", &self.id)
            .field("state", &inner.state)
            .field("stop_requested", &inner.stop_requested)
            .finish()
    }
}

/// Stop information collected while the executor runs.
#[derive(Debug)]
struct Interrupt {
    scope: StopScope,
    cause: Option<Arc<WorkError>>,
    raised: bool,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self {
            scope: StopScope::Executor,
            cause: None,
            raised: false,
        }
    }
}

impl Interrupt {
    fn is_clear(&self) -> bool {
        !self.raised
    }

    fn absorb(&mut self, error: WorkError) {
        self.raised = true;
        match error {
            WorkError::Stop { scope, cause } => {
                self.scope = self.scope.max(scope);
                if self.cause.is_none() {
                    self.cause = cause;
                }
            }
            other => {
                if self.cause.is_none() {
                    self.cause = Some(Arc::new(other));
                }
            }
        }
    }
}

/// Awaits a hook, turning a panic into [`WorkError::Panicked`].
async fn guarded<F>(fut: F) -> Result<(), WorkError>
where
    F: std::future::Future<Output = Result<(), WorkError>>,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(WorkError::Panicked {
                info: panic_message(&*panic),
            })
        })
}
