//! # Trigger contract.
//!
//! A [`Trigger`] decides *when* its manager fires. The manager hands it a
//! [`FireHandle`] on start and drives its shutdown:
//!
//! ```text
//! manager.run_async ──► trigger.start(handle)
//!                           └─ (own task) handle.fire(args) ... handle.trigger_stopped(err?)
//! manager drain     ──► trigger.stop_execution(false)   stop firing, don't wait
//!                   ──► trigger.stop_execution(true)    wait until the firing loop exited
//! executor success  ──► trigger.on_run_completed(id)
//! ```
//!
//! ## Rules
//! - `start` must return promptly; firing happens on the trigger's own task.
//! - A trigger that finishes on its own calls `handle.trigger_stopped(..)`;
//!   one stopped by the manager does not.
//! - `stop_execution` is idempotent.

use async_trait::async_trait;

use crate::core::{ExecutionState, ExecutorId, FireHandle};
use crate::error::TriggerError;

/// Source of firings for an [`ExecutionManager`](crate::ExecutionManager).
#[async_trait]
pub trait Trigger<A: Send + Sync + 'static>: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Starts firing through `handle`.
    async fn start(&self, handle: FireHandle<A>) -> Result<(), TriggerError>;

    /// Stops firing; with `wait`, resolves once no firing is in progress.
    async fn stop_execution(&self, wait: bool);

    /// Lifecycle state of the trigger.
    fn state(&self) -> ExecutionState;

    /// Error the trigger stopped with, if any.
    fn error(&self) -> Option<TriggerError>;

    /// Called after an executor of this trigger finished successfully.
    ///
    /// An error stops the manager with
    /// [`StopReason::ExecutionManagerException`](crate::StopReason::ExecutionManagerException).
    fn on_run_completed(&self, _executor: ExecutorId) -> Result<(), TriggerError> {
        Ok(())
    }
}
