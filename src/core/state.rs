//! # Lifecycle states, verdicts and stop reasons.
//!
//! Shared by [`Executor`](crate::Executor) and
//! [`ExecutionManager`](crate::ExecutionManager):
//!
//! ```text
//! NotStarted ──► Started ──► Running ──► Stopping ──► Stopped
//! ```
//!
//! ## Rules
//! - Transitions are **monotonic**: a state never moves backwards.
//! - Skipping forward is allowed (e.g. `Started → Stopping` when the
//!   pre-work hook fails, `NotStarted → Stopped` for a manager stopped
//!   before it ran).
//! - `Stopped` is the only terminal state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Global sequence for executor identities.
static EXECUTOR_SEQ: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of an executor, a manager or a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ExecutionState {
    /// Created, never run.
    #[default]
    NotStarted,
    /// Run requested; pre-work initialization in progress.
    Started,
    /// Work in progress.
    Running,
    /// Stop accepted; draining in-flight work.
    Stopping,
    /// Terminal.
    Stopped,
}

impl ExecutionState {
    /// Returns `true` if moving to `next` keeps the sequence monotonic.
    #[inline]
    pub fn can_advance_to(self, next: ExecutionState) -> bool {
        next > self
    }

    /// `Started` or `Running`.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, ExecutionState::Started | ExecutionState::Running)
    }

    /// `Stopping` or `Stopped`.
    #[inline]
    pub fn is_stopping_or_stopped(self) -> bool {
        matches!(self, ExecutionState::Stopping | ExecutionState::Stopped)
    }

    /// Advances `slot` to `next` if the move is monotonic.
    ///
    /// Returns `true` when the state changed.
    #[inline]
    pub(crate) fn advance(slot: &mut ExecutionState, next: ExecutionState) -> bool {
        if slot.can_advance_to(next) {
            *slot = next;
            true
        } else {
            false
        }
    }
}

/// Verdict of a finished executor.
///
/// Stays `Undetermined` until the executor reaches [`ExecutionState::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorResult {
    /// Not finished yet.
    #[default]
    Undetermined,
    /// Stopped without a captured error.
    Successful,
    /// Stopped with a captured error.
    Unsuccessful,
}

/// Why a manager stopped. Recorded once per manager lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// No stop accepted yet.
    #[default]
    NotStopped,
    /// The trigger finished on its own (e.g. single firing done).
    TriggerStop,
    /// The trigger failed to start or reported an error.
    TriggerException,
    /// An executor asked the manager to stop without an error.
    ExecutorStop,
    /// An executor failed under `ExceptionHandling::Stop`, or asked the
    /// manager to stop with an error.
    ExecutorExceptionStop,
    /// [`ExecutionManager::stop`](crate::ExecutionManager::stop) was called.
    ExecutionManagerStop,
    /// The cancellation token passed to `run_async` was cancelled.
    ExecutionManagerCancellationTokenStop,
    /// The manager itself failed (construction, post-run callback).
    ExecutionManagerException,
}

impl StopReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StopReason::NotStopped => "not_stopped",
            StopReason::TriggerStop => "trigger_stop",
            StopReason::TriggerException => "trigger_exception",
            StopReason::ExecutorStop => "executor_stop",
            StopReason::ExecutorExceptionStop => "executor_exception_stop",
            StopReason::ExecutionManagerStop => "manager_stop",
            StopReason::ExecutionManagerCancellationTokenStop => "manager_cancellation_stop",
            StopReason::ExecutionManagerException => "manager_exception",
        }
    }
}

/// How far a stop signal reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StopScope {
    /// Stop only the executor that raised it.
    Executor,
    /// Stop the owning manager and every live executor.
    Manager,
}

/// Opaque executor identity, unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutorId(u64);

impl ExecutorId {
    pub(crate) fn next() -> Self {
        Self(EXECUTOR_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec-{}", self.0)
    }
}
