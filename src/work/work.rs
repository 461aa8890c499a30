//! # Simple unit of work.
//!
//! A [`Work`] is instantiated by the manager's factory once per firing and
//! driven through three calls:
//!
//! ```text
//! on_started()  pre-work initialization; an error aborts the run
//!      ▼
//! run()         the Run phase (observed, exception policy applied)
//!      ▼
//! on_stopped()  after in-flight work drained; errors are recorded
//! ```

use async_trait::async_trait;

use crate::error::WorkError;
use crate::work::ExecutorContext;

/// # Asynchronous unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskfire::{ExecutorContext, Work, WorkError};
///
/// struct Mirror;
///
/// #[async_trait]
/// impl Work<String> for Mirror {
///     async fn run(&self, ctx: &ExecutorContext<String>) -> Result<(), WorkError> {
///         let Some(target) = ctx.args() else {
///             return Err(ctx.stop(Some(WorkError::fail("no target"))));
///         };
///         if ctx.is_stop_requested() {
///             return Ok(());
///         }
///         // sync `target`...
///         let _ = target;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Work<A: Send + Sync + 'static>: Send + Sync + 'static {
    /// Pre-work initialization. An error aborts the run before `run`.
    async fn on_started(&self, _ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        Ok(())
    }

    /// The unit of work.
    ///
    /// Return `Err(ctx.stop(..))` or `Err(ctx.stop_manager(..))` to stop.
    async fn run(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError>;

    /// Called once all in-flight work of the executor has drained.
    async fn on_stopped(&self, _ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        Ok(())
    }
}
