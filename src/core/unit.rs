//! Internal seam between an [`Executor`](crate::Executor) and the user's work.
//!
//! The executor owns the lifecycle; a [`Unit`] owns what happens while
//! `Running`. Two shapes exist: [`SingleUnit`] (one `Run` phase) and
//! [`CollectionUnit`](crate::core::collection::CollectionUnit).

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::runner::run_phase;
use crate::error::WorkError;
use crate::phases::{PhaseArgs, PhaseKind};
use crate::policies::ExceptionHandling;
use crate::work::{ExecutorContext, Work};

/// Work driven by an executor.
#[async_trait]
pub(crate) trait Unit<A: Send + Sync + 'static>: Send + Sync {
    async fn on_started(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError>;
    async fn drive(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError>;
    async fn on_stopped(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError>;
}

/// Builds a fresh unit per firing. Errors and panics count as construction
/// failures.
pub(crate) type UnitFactory<A> = Arc<dyn Fn() -> anyhow::Result<Box<dyn Unit<A>>> + Send + Sync>;

/// [`Work`] run as a single `Run` phase.
pub(crate) struct SingleUnit<W>(pub(crate) Arc<W>);

impl<W> SingleUnit<W> {
    pub(crate) fn new(work: W) -> Self {
        Self(Arc::new(work))
    }
}

#[async_trait]
impl<A, W> Unit<A> for SingleUnit<W>
where
    A: Send + Sync + 'static,
    W: Work<A>,
{
    async fn on_started(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        self.0.on_started(ctx).await
    }

    async fn drive(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        let exec = ctx.executor();
        let phase = PhaseArgs::new(PhaseKind::Run, Arc::clone(exec));
        run_phase(exec, &phase, ExceptionHandling::Stop, self.0.run(ctx))
            .await
            .map(|_| ())
    }

    async fn on_stopped(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        self.0.on_stopped(ctx).await
    }
}
