//! # Function-backed work (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: Fn(ExecutorContext<A>) -> Fut`, producing a
//! fresh future per run. State shared between runs has to be explicit
//! (`Arc<...>` captured by the closure).
//!
//! ## Example
//! ```rust
//! use taskfire::{ExecutorContext, WorkError, WorkFn};
//!
//! let work = WorkFn::new(|ctx: ExecutorContext<()>| async move {
//!     if ctx.is_stop_requested() {
//!         return Ok(());
//!     }
//!     // do work...
//!     Ok::<_, WorkError>(())
//! });
//! # let _ = work;
//! ```

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use crate::error::WorkError;
use crate::work::{ExecutorContext, Work};

/// Closure-backed [`Work`].
pub struct WorkFn<F> {
    f: F,
}

impl<F> WorkFn<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for WorkFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<A, F, Fut> Work<A> for WorkFn<F>
where
    A: Send + Sync + 'static,
    F: Fn(ExecutorContext<A>) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    async fn run(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        (self.f)(ctx.clone()).await
    }
}
