//! # Collection driver.
//!
//! Drives a [`CollectionWork`] through its phases:
//!
//! ```text
//! CollectionRun        produce()                      policy: Stop
//! CollectionIterate    ┌ sequential: next → ItemRun   policy: Stop (stream errors are fatal)
//!                      └ parallel:   permit → spawn ItemRun, join all
//! CompletionRun        complete(all_items_completed)  policy: Stop
//! ```
//!
//! ## Rules
//! - A claim check runs before every item: unless full execution was asked
//!   for, a stopping executor starts no new item and `all_items_completed`
//!   becomes `false`.
//! - In parallel mode the check runs twice: before spawning (after the
//!   permit was acquired) and again inside the spawned item.
//! - A stop raised by an item is held until `complete` ran, then returned.
//! - A stream `Err` skips `complete` and stops the executor.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::runner::run_phase;
use crate::core::unit::Unit;
use crate::core::{Executor, StopScope};
use crate::error::WorkError;
use crate::phases::{ItemRef, PhaseArgs, PhaseKind};
use crate::policies::ExceptionHandling;
use crate::work::{CollectionOptions, CollectionWork, ExecutorContext, ItemStream};

/// [`CollectionWork`] run as produce → iterate → complete.
pub(crate) struct CollectionUnit<C>(pub(crate) Arc<C>);

impl<C> CollectionUnit<C> {
    pub(crate) fn new(work: C) -> Self {
        Self(Arc::new(work))
    }
}

#[async_trait]
impl<A, C> Unit<A> for CollectionUnit<C>
where
    A: Send + Sync + 'static,
    C: CollectionWork<A>,
{
    async fn on_started(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        self.0.on_started(ctx).await
    }

    async fn drive(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        run_collection(&self.0, ctx).await
    }

    async fn on_stopped(&self, ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        self.0.on_stopped(ctx).await
    }
}

/// Result of the iteration pass.
#[derive(Debug)]
struct Pass {
    all_completed: bool,
    stop: Option<WorkError>,
}

impl Default for Pass {
    fn default() -> Self {
        Self {
            all_completed: true,
            stop: None,
        }
    }
}

impl Pass {
    fn hold(&mut self, stop: WorkError) {
        self.stop.get_or_insert(stop);
    }
}

enum ItemStatus {
    Attempted,
    Skipped,
    Stopped(WorkError),
}

async fn run_collection<A, C>(work: &Arc<C>, ctx: &ExecutorContext<A>) -> Result<(), WorkError>
where
    A: Send + Sync + 'static,
    C: CollectionWork<A>,
{
    let exec = ctx.executor();
    let options = work.options();

    let produce = PhaseArgs::new(PhaseKind::CollectionRun, Arc::clone(exec));
    let Some(items) = run_phase(exec, &produce, ExceptionHandling::Stop, work.produce(ctx)).await?
    else {
        return Ok(());
    };

    let iterate = PhaseArgs::new(PhaseKind::CollectionIterate, Arc::clone(exec));
    let pass = run_phase(exec, &iterate, ExceptionHandling::Stop, async {
        if options.parallel {
            iterate_parallel(work, ctx, items, options).await
        } else {
            iterate_sequential(work, ctx, items, options).await
        }
    })
    .await?;
    let Some(pass) = pass else {
        return Ok(());
    };

    let completion = PhaseArgs::completion_run(Arc::clone(exec), pass.all_completed);
    let completed = run_phase(
        exec,
        &completion,
        ExceptionHandling::Stop,
        work.complete(ctx, pass.all_completed),
    )
    .await;

    match pass.stop {
        Some(stop) => Err(stop),
        None => completed.map(|_| ()),
    }
}

/// Returns `true` if a new item may start.
fn may_claim<A: 'static>(exec: &Executor<A>, options: &CollectionOptions) -> bool {
    options.complete_full_execution_on_stop || !exec.is_stop_requested()
}

/// Maps a stream element error onto the iteration failure it stands for.
fn iterate_error(error: WorkError) -> WorkError {
    match error {
        e @ (WorkError::CollectionIterate { .. } | WorkError::Stop { .. }) => e,
        other => WorkError::CollectionIterate {
            error: other.to_string(),
        },
    }
}

async fn iterate_sequential<A, C>(
    work: &Arc<C>,
    ctx: &ExecutorContext<A>,
    mut items: ItemStream<C::Item>,
    options: CollectionOptions,
) -> Result<Pass, WorkError>
where
    A: Send + Sync + 'static,
    C: CollectionWork<A>,
{
    let exec = ctx.executor();
    let mut pass = Pass::default();
    let mut index = 0usize;

    while let Some(next) = items.next().await {
        let item = Arc::new(next.map_err(iterate_error)?);
        if !may_claim(exec, &options) {
            pass.all_completed = false;
            break;
        }

        let phase = PhaseArgs::item_run(Arc::clone(exec), ItemRef::new(index, Arc::clone(&item)));
        let res = run_phase(
            exec,
            &phase,
            options.item_exception_handling,
            work.process(ctx, index, &item),
        )
        .await;
        if let Err(stop) = res {
            pass.hold(stop);
        }
        index += 1;
    }
    Ok(pass)
}

async fn iterate_parallel<A, C>(
    work: &Arc<C>,
    ctx: &ExecutorContext<A>,
    mut items: ItemStream<C::Item>,
    options: CollectionOptions,
) -> Result<Pass, WorkError>
where
    A: Send + Sync + 'static,
    C: CollectionWork<A>,
{
    let exec = ctx.executor();
    let permits = Arc::new(Semaphore::new(options.effective_parallelism()));
    let mut workers: JoinSet<ItemStatus> = JoinSet::new();
    let mut pass = Pass::default();
    let mut failure = None;
    let mut index = 0usize;

    while let Some(next) = items.next().await {
        let item = match next {
            Ok(item) => Arc::new(item),
            Err(e) => {
                failure = Some(iterate_error(e));
                break;
            }
        };
        if !may_claim(exec, &options) {
            pass.all_completed = false;
            break;
        }
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            pass.all_completed = false;
            break;
        };
        // A stop may have landed while we waited for a slot.
        if !may_claim(exec, &options) {
            pass.all_completed = false;
            break;
        }

        let work = Arc::clone(work);
        let ctx = ctx.clone();
        workers.spawn(async move {
            let _permit = permit;
            let exec = ctx.executor();
            if !may_claim(exec, &options) {
                return ItemStatus::Skipped;
            }
            let phase =
                PhaseArgs::item_run(Arc::clone(exec), ItemRef::new(index, Arc::clone(&item)));
            match run_phase(
                exec,
                &phase,
                options.item_exception_handling,
                work.process(&ctx, index, &item),
            )
            .await
            {
                Ok(_) => ItemStatus::Attempted,
                Err(stop) => ItemStatus::Stopped(stop),
            }
        });
        index += 1;
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(ItemStatus::Attempted) => {}
            Ok(ItemStatus::Skipped) => pass.all_completed = false,
            Ok(ItemStatus::Stopped(stop)) => pass.hold(stop),
            Err(join_error) => {
                tracing::error!(executor = %exec.id(), error = %join_error, "item worker aborted");
                exec.signal_stop(StopScope::Executor);
                pass.hold(WorkError::Stop {
                    scope: StopScope::Executor,
                    cause: Some(Arc::new(WorkError::Panicked {
                        info: join_error.to_string(),
                    })),
                });
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(pass),
    }
}
