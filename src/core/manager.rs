//! # Execution manager.
//!
//! [`ExecutionManager`] binds a trigger to an executor factory. Every firing
//! of the trigger builds a fresh unit of work, wraps it in an
//! [`Executor`] and runs it. The manager tracks live executors, escalates
//! executor failures per [`ExceptionHandling`](crate::ExceptionHandling) and
//! owns the stop protocol.
//!
//! ## Architecture
//! ```text
//! run_async(token)
//!   ├─► NotStarted → Started
//!   ├─► watch(token) ──cancelled──► request_stop(CancellationTokenStop)
//!   ├─► trigger.start(FireHandle)
//!   │       └─ fire(args) ─► factory() ─► Executor ─► live map ─► execute ─► escalate
//!   └─► wait until Stopped ─► RunSummary
//!
//! request_stop(reason)   first accepted request wins
//!   └─► Stopping ─► drain:
//!         trigger.stop_execution(false)
//!         loop { live.request_stop(); wait live_changed } until live is empty
//!         trigger.stop_execution(true)
//!         Stopped ─► cancel token
//! ```
//!
//! ## Rules
//! - The stop reason, the stopping executor and the execution error are
//!   recorded exactly once, by the first accepted stop.
//! - A firing after the manager left `Running` is ignored.
//! - Lock order is executor → manager: the manager never locks an executor
//!   while holding its own lock.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{Notify, Semaphore, watch};
use tokio_util::sync::CancellationToken;

use crate::config::ManagerConfig;
use crate::core::unit::UnitFactory;
use crate::core::{
    ExecutionState, Executor, ExecutorBinding, ExecutorId, ExecutorOutcome, ExecutorResult,
    ExecutorSnapshot, StopReason, StopScope,
};
use crate::error::{EngineError, TriggerError, panic_message};
use crate::observers::ObserverSet;
use crate::triggers::Trigger;

/// Result of one firing.
#[derive(Debug, Clone)]
pub enum FireOutcome {
    /// The manager was not accepting firings.
    Ignored,
    /// No executor ran: construction failed and the manager is stopping.
    Rejected,
    /// An executor ran to `Stopped`.
    Completed(ExecutorSnapshot),
}

/// Final view of a manager run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Always `Stopped` when returned by `run_async`.
    pub status: ExecutionState,
    /// Reason recorded by the first accepted stop.
    pub stop_reason: StopReason,
    /// Executor that caused the stop, if any.
    pub stop_executor: Option<ExecutorId>,
    /// Executors created over the manager's lifetime.
    pub executor_count: u64,
    /// Error recorded by the first accepted stop.
    pub execution_error: Option<Arc<EngineError>>,
}

struct ManagerState<A> {
    status: ExecutionState,
    stop_reason: StopReason,
    stop_executor: Option<ExecutorId>,
    execution_error: Option<Arc<EngineError>>,
    last_executor: Option<Arc<Executor<A>>>,
    executor_count: u64,
    live: HashMap<ExecutorId, Arc<Executor<A>>>,
}

impl<A> Default for ManagerState<A> {
    fn default() -> Self {
        Self {
            status: ExecutionState::NotStarted,
            stop_reason: StopReason::NotStopped,
            stop_executor: None,
            execution_error: None,
            last_executor: None,
            executor_count: 0,
            live: HashMap::new(),
        }
    }
}

#[derive(Clone, Copy)]
enum StopDecision {
    Immediate,
    Drain,
    Ignored,
}

pub(crate) struct Shared<A: Send + Sync + 'static> {
    config: ManagerConfig,
    trigger: Arc<dyn Trigger<A>>,
    factory: UnitFactory<A>,
    args: Option<Arc<A>>,
    observers: Arc<ObserverSet<A>>,
    token: CancellationToken,
    state: Mutex<ManagerState<A>>,
    status_tx: watch::Sender<ExecutionState>,
    live_changed: Notify,
    firing_gate: Semaphore,
}

/// Orchestrates executors for the firings of one trigger.
///
/// Cloning is cheap; clones share the same manager.
pub struct ExecutionManager<A: Send + Sync + 'static> {
    shared: Arc<Shared<A>>,
}

impl<A: Send + Sync + 'static> Clone for ExecutionManager<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: Send + Sync + 'static> ExecutionManager<A> {
    pub(crate) fn new(
        config: ManagerConfig,
        trigger: Arc<dyn Trigger<A>>,
        factory: UnitFactory<A>,
        args: Option<Arc<A>>,
        observers: Arc<ObserverSet<A>>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ExecutionState::NotStarted);
        Self {
            shared: Arc::new(Shared {
                config,
                trigger,
                factory,
                args,
                observers,
                token: CancellationToken::new(),
                state: Mutex::new(ManagerState::default()),
                status_tx,
                live_changed: Notify::new(),
                firing_gate: Semaphore::new(1),
            }),
        }
    }

    /// Runs the manager until it stops.
    ///
    /// Cancelling `token` stops the manager with
    /// [`StopReason::ExecutionManagerCancellationTokenStop`]. A second call
    /// fails with [`EngineError::InvalidState`]; a manager stopped before it
    /// ran fails the same way.
    pub async fn run_async(&self, token: CancellationToken) -> Result<RunSummary, EngineError> {
        let shared = &self.shared;
        {
            let mut st = shared.lock();
            if st.status != ExecutionState::NotStarted {
                return Err(EngineError::InvalidState {
                    operation: "run_async",
                    reason: "manager already ran",
                    state: st.status,
                });
            }
            shared.set_status(&mut st, ExecutionState::Started);
        }
        tracing::info!(trigger = shared.trigger.name(), "execution manager started");

        shared.watch_cancellation(token);

        let handle = FireHandle {
            manager: Arc::downgrade(shared),
        };
        if let Err(e) = shared.trigger.start(handle).await {
            tracing::error!(trigger = shared.trigger.name(), error = %e, "trigger failed to start");
            shared.request_stop(
                StopReason::TriggerException,
                None,
                Some(EngineError::Trigger(e)),
            );
        }

        self.wait_stopped().await;
        Ok(self.summary())
    }

    /// Runs the manager with a token nobody cancels.
    pub async fn run(&self) -> Result<RunSummary, EngineError> {
        self.run_async(CancellationToken::new()).await
    }

    /// Stops the manager and waits until it is `Stopped`.
    ///
    /// Idempotent: later calls wait for the same drain and keep the first
    /// recorded reason.
    pub async fn stop(&self) {
        self.shared
            .request_stop(StopReason::ExecutionManagerStop, None, None);
        self.wait_stopped().await;
    }

    /// Resolves once the manager is `Stopped`.
    pub async fn wait_stopped(&self) {
        let mut rx = self.shared.status_tx.subscribe();
        loop {
            if *rx.borrow_and_update() == ExecutionState::Stopped {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ExecutionState {
        self.shared.lock().status
    }

    /// Reason recorded by the first accepted stop.
    pub fn stop_reason(&self) -> StopReason {
        self.shared.lock().stop_reason
    }

    /// Executor that caused the stop, if any.
    pub fn stop_executor(&self) -> Option<ExecutorId> {
        self.shared.lock().stop_executor
    }

    /// Error recorded by the first accepted stop.
    pub fn execution_error(&self) -> Option<Arc<EngineError>> {
        self.shared.lock().execution_error.clone()
    }

    /// Executors created so far.
    pub fn executor_count(&self) -> u64 {
        self.shared.lock().executor_count
    }

    /// Most recently created executor.
    pub fn last_executor(&self) -> Option<ExecutorSnapshot> {
        let last = self.shared.lock().last_executor.clone();
        last.map(|e| e.snapshot())
    }

    /// Identities of the executors currently live, sorted.
    pub fn live_executors(&self) -> Vec<ExecutorId> {
        let mut ids: Vec<ExecutorId> = self.shared.lock().live.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The manager's configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// The trigger driving this manager.
    pub fn trigger(&self) -> &Arc<dyn Trigger<A>> {
        &self.shared.trigger
    }

    /// Point-in-time summary.
    pub fn summary(&self) -> RunSummary {
        let st = self.shared.lock();
        RunSummary {
            status: st.status,
            stop_reason: st.stop_reason,
            stop_executor: st.stop_executor,
            executor_count: st.executor_count,
            execution_error: st.execution_error.clone(),
        }
    }
}

impl<A: Send + Sync + 'static> Shared<A> {
    fn lock(&self) -> MutexGuard<'_, ManagerState<A>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> ExecutionState {
        self.lock().status
    }

    fn set_status(&self, st: &mut ManagerState<A>, next: ExecutionState) {
        if ExecutionState::advance(&mut st.status, next) {
            self.status_tx.send_replace(next);
        }
    }

    fn watch_cancellation(self: &Arc<Self>, token: CancellationToken) {
        let manager = Arc::downgrade(self);
        let own = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    if let Some(shared) = manager.upgrade() {
                        shared.request_stop(StopReason::ExecutionManagerCancellationTokenStop, None, None);
                    }
                }
                _ = own.cancelled() => {}
            }
        });
    }

    /// Accepts the first stop request; later ones are ignored.
    ///
    /// Returns `true` if this request was accepted.
    fn request_stop(
        self: &Arc<Self>,
        reason: StopReason,
        executor: Option<ExecutorId>,
        error: Option<EngineError>,
    ) -> bool {
        let decision = {
            let mut st = self.lock();
            let decision = match st.status {
                ExecutionState::NotStarted => StopDecision::Immediate,
                ExecutionState::Started | ExecutionState::Running => StopDecision::Drain,
                ExecutionState::Stopping | ExecutionState::Stopped => StopDecision::Ignored,
            };
            match decision {
                StopDecision::Ignored => {}
                StopDecision::Immediate => {
                    self.record_stop(&mut st, reason, executor, error);
                    self.set_status(&mut st, ExecutionState::Stopped);
                }
                StopDecision::Drain => {
                    self.record_stop(&mut st, reason, executor, error);
                    self.set_status(&mut st, ExecutionState::Stopping);
                }
            }
            decision
        };

        match decision {
            StopDecision::Ignored => {
                tracing::trace!(reason = reason.as_label(), "stop request ignored");
                false
            }
            StopDecision::Immediate => {
                self.token.cancel();
                tracing::info!(reason = reason.as_label(), "execution manager stopped before running");
                true
            }
            StopDecision::Drain => {
                tracing::info!(reason = reason.as_label(), executor = ?executor, "execution manager stopping");
                tokio::spawn(Arc::clone(self).drain());
                true
            }
        }
    }

    fn record_stop(
        &self,
        st: &mut ManagerState<A>,
        reason: StopReason,
        executor: Option<ExecutorId>,
        error: Option<EngineError>,
    ) {
        st.stop_reason = reason;
        st.stop_executor = executor;
        st.execution_error = error.map(Arc::new);
    }

    async fn drain(self: Arc<Self>) {
        self.trigger.stop_execution(false).await;

        loop {
            let changed = self.live_changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            let live: Vec<Arc<Executor<A>>> = self.lock().live.values().cloned().collect();
            if live.is_empty() {
                break;
            }
            for executor in &live {
                executor.request_stop();
            }
            changed.await;
        }

        self.trigger.stop_execution(true).await;

        let reason = {
            let mut st = self.lock();
            self.set_status(&mut st, ExecutionState::Stopped);
            st.stop_reason
        };
        self.token.cancel();
        tracing::info!(reason = reason.as_label(), "execution manager stopped");
    }

    fn binding(self: &Arc<Self>) -> ExecutorBinding<A> {
        let manager = Arc::downgrade(self);
        let trigger = Arc::clone(&self.trigger);
        ExecutorBinding::new(Arc::clone(&self.observers))
            .with_on_stopped(Arc::new(move |id| {
                if let Some(shared) = manager.upgrade() {
                    shared.lock().live.remove(&id);
                    shared.live_changed.notify_waiters();
                }
            }))
            .with_post_run(Arc::new(move |id| trigger.on_run_completed(id)))
    }

    fn construction_failed(self: &Arc<Self>, error: String) -> FireOutcome {
        tracing::error!(error = %error, "executor construction failed");
        self.request_stop(
            StopReason::ExecutionManagerException,
            None,
            Some(EngineError::Construction { error }),
        );
        FireOutcome::Rejected
    }

    async fn fire(self: &Arc<Self>, args: Option<A>) -> FireOutcome {
        let _turn = if self.config.serializes_firings() {
            match self.firing_gate.acquire().await {
                Ok(permit) => Some(permit),
                Err(_) => return FireOutcome::Ignored,
            }
        } else {
            None
        };

        if !self.status().is_active() {
            tracing::debug!("firing ignored: manager not running");
            return FireOutcome::Ignored;
        }

        let unit = match catch_unwind(AssertUnwindSafe(|| (self.factory)())) {
            Ok(Ok(unit)) => unit,
            Ok(Err(e)) => return self.construction_failed(format!("{e:#}")),
            Err(panic) => return self.construction_failed(panic_message(&*panic)),
        };

        let args = args.map(Arc::new).or_else(|| self.args.clone());
        let executor = Arc::new(Executor::with_parent(args, &self.token));
        if let Err(e) = executor.configure(self.binding()) {
            return self.construction_failed(e.to_string());
        }
        let id = executor.id();

        {
            let mut st = self.lock();
            if !st.status.is_active() {
                return FireOutcome::Ignored;
            }
            st.live.insert(id, Arc::clone(&executor));
            st.executor_count += 1;
            st.last_executor = Some(Arc::clone(&executor));
            self.set_status(&mut st, ExecutionState::Running);
        }
        tracing::debug!(executor = %id, "executor registered");

        match executor.execute(unit.as_ref()).await {
            Ok(outcome) => self.settle(outcome),
            Err(e) => {
                // execute refused to run, so the executor never removed itself.
                self.lock().live.remove(&id);
                self.live_changed.notify_waiters();
                tracing::error!(executor = %id, error = %e, "executor refused to run");
                self.request_stop(StopReason::ExecutionManagerException, Some(id), Some(e));
                return FireOutcome::Rejected;
            }
        }

        FireOutcome::Completed(executor.snapshot())
    }

    /// Escalates a finished executor to the manager.
    fn settle(self: &Arc<Self>, outcome: ExecutorOutcome) {
        let ExecutorOutcome {
            id,
            result,
            error,
            scope,
            post_run_error,
        } = outcome;

        if let Some(error) = post_run_error {
            self.request_stop(
                StopReason::ExecutionManagerException,
                Some(id),
                Some(EngineError::PostRun { error }),
            );
            return;
        }

        let executor_error = error.map(|error| EngineError::Executor { error });
        match (scope, result) {
            (StopScope::Manager, _) => {
                let reason = if executor_error.is_some() {
                    StopReason::ExecutorExceptionStop
                } else {
                    StopReason::ExecutorStop
                };
                self.request_stop(reason, Some(id), executor_error);
            }
            (StopScope::Executor, ExecutorResult::Unsuccessful) => {
                if self.config.exception_handling.stops() {
                    self.request_stop(StopReason::ExecutorExceptionStop, Some(id), executor_error);
                } else if let Some(e) = &executor_error {
                    tracing::warn!(executor = %id, error = %e, "executor failed; continuing");
                }
            }
            _ => {}
        }
    }
}

/// Handle a trigger uses to drive its manager.
///
/// Holds a weak reference: a dropped manager turns every call into a no-op.
pub struct FireHandle<A: Send + Sync + 'static> {
    manager: Weak<Shared<A>>,
}

impl<A: Send + Sync + 'static> Clone for FireHandle<A> {
    fn clone(&self) -> Self {
        Self {
            manager: Weak::clone(&self.manager),
        }
    }
}

impl<A: Send + Sync + 'static> FireHandle<A> {
    /// Fires the manager once and waits for the executor to stop.
    ///
    /// `args` overrides the manager's default pass-through args.
    pub async fn fire(&self, args: Option<A>) -> FireOutcome {
        match self.manager.upgrade() {
            Some(shared) => shared.fire(args).await,
            None => FireOutcome::Ignored,
        }
    }

    /// Reports that the trigger stopped on its own.
    ///
    /// `None` stops the manager with [`StopReason::TriggerStop`], an error with
    /// [`StopReason::TriggerException`].
    pub fn trigger_stopped(&self, error: Option<TriggerError>) {
        let Some(shared) = self.manager.upgrade() else {
            return;
        };
        match error {
            None => shared.request_stop(StopReason::TriggerStop, None, None),
            Some(e) => shared.request_stop(
                StopReason::TriggerException,
                None,
                Some(EngineError::Trigger(e)),
            ),
        };
    }

    /// Returns `true` while the manager accepts firings.
    pub fn is_accepting(&self) -> bool {
        self.manager
            .upgrade()
            .is_some_and(|shared| shared.status().is_active())
    }
}

impl<A: Send + Sync + 'static> std::fmt::Debug for FireHandle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FireHandle")
            .field("accepting", &self.is_accepting())
            .finish()
    }
}
