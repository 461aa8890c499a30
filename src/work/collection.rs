//! # Collection unit of work.
//!
//! A [`CollectionWork`] runs three phases:
//!
//! ```text
//! produce()            ─► CollectionRun       (stream of items)
//! process(item) × N    ─► ItemRun × N         (inside CollectionIterate)
//! complete(all_done)   ─► CompletionRun
//! ```
//!
//! ## Rules
//! - Sequential mode processes items in index order.
//! - Parallel mode runs at most `effective_parallelism()` items at once, in no
//!   particular order.
//! - Unless `complete_full_execution_on_stop` is set, a stop request lets
//!   in-flight items finish but starts no new one, and `complete` receives
//!   `false`.
//! - An empty collection still runs `complete(true)`.
//! - An `Err` yielded by the item stream itself is a fatal
//!   `CollectionIterate` failure: `complete` is skipped and the executor stops.

use std::fmt;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::WorkError;
use crate::policies::ExceptionHandling;
use crate::work::ExecutorContext;

/// Stream of produced items. An `Err` element is an iteration failure.
pub type ItemStream<T> = BoxStream<'static, Result<T, WorkError>>;

/// Builds an [`ItemStream`] from an in-memory collection.
///
/// ## Example
/// ```rust
/// use taskfire::item_stream;
///
/// let items = item_stream(vec![1, 2, 3]);
/// # let _ = items;
/// ```
pub fn item_stream<T, I>(items: I) -> ItemStream<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
{
    futures::stream::iter(items.into_iter().map(Ok)).boxed()
}

/// Item-processing options of a collection executor.
///
/// ## Field semantics
/// - `parallel`: process items concurrently on a bounded worker pool
/// - `max_degree_of_parallelism`: pool size (`None`/`0` = available parallelism)
/// - `item_exception_handling`: `Stop` aborts remaining items, `Continue` records and moves on
/// - `complete_full_execution_on_stop`: keep starting items after a stop request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CollectionOptions {
    /// Process items concurrently.
    pub parallel: bool,
    /// Worker-pool cap for parallel mode.
    pub max_degree_of_parallelism: Option<usize>,
    /// Reaction to a failed item.
    pub item_exception_handling: ExceptionHandling,
    /// Attempt every item even after a stop request.
    pub complete_full_execution_on_stop: bool,
}

impl CollectionOptions {
    /// Sequential processing, in index order.
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Parallel processing with an optional cap.
    pub fn parallel(max_degree_of_parallelism: Option<usize>) -> Self {
        Self {
            parallel: true,
            max_degree_of_parallelism,
            ..Self::default()
        }
    }

    /// Returns options with the given per-item policy.
    pub fn with_item_exception_handling(mut self, handling: ExceptionHandling) -> Self {
        self.item_exception_handling = handling;
        self
    }

    /// Returns options with the given full-execution flag.
    pub fn with_complete_full_execution_on_stop(mut self, complete: bool) -> Self {
        self.complete_full_execution_on_stop = complete;
        self
    }

    /// Number of items that may run at once in parallel mode.
    ///
    /// - `Some(n)` with `n > 0` → `n`
    /// - `None` or `Some(0)` → `std::thread::available_parallelism()` (1 if unknown)
    #[inline]
    pub fn effective_parallelism(&self) -> usize {
        match self.max_degree_of_parallelism {
            Some(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

/// # Three-phase unit of work over a collection.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskfire::{
///     CollectionOptions, CollectionWork, ExecutorContext, ItemStream, WorkError, item_stream,
/// };
///
/// struct Resize;
///
/// #[async_trait]
/// impl CollectionWork<()> for Resize {
///     type Item = String;
///
///     fn options(&self) -> CollectionOptions {
///         CollectionOptions::parallel(Some(4))
///     }
///
///     async fn produce(&self, _ctx: &ExecutorContext<()>) -> Result<ItemStream<String>, WorkError> {
///         Ok(item_stream(vec!["a.png".to_string(), "b.png".to_string()]))
///     }
///
///     async fn process(
///         &self,
///         _ctx: &ExecutorContext<()>,
///         _index: usize,
///         _path: &String,
///     ) -> Result<(), WorkError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait CollectionWork<A: Send + Sync + 'static>: Send + Sync + 'static {
    /// Item type; `Debug` is used for phase logs.
    type Item: fmt::Debug + Send + Sync + 'static;

    /// Item-processing options. Read once per run.
    fn options(&self) -> CollectionOptions {
        CollectionOptions::default()
    }

    /// Pre-work initialization. An error aborts the run before `produce`.
    async fn on_started(&self, _ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        Ok(())
    }

    /// Produces the items to process.
    async fn produce(&self, ctx: &ExecutorContext<A>) -> Result<ItemStream<Self::Item>, WorkError>;

    /// Processes one item.
    async fn process(
        &self,
        ctx: &ExecutorContext<A>,
        index: usize,
        item: &Self::Item,
    ) -> Result<(), WorkError>;

    /// Runs after the items; `all_items_completed` is `false` after an early stop.
    async fn complete(
        &self,
        _ctx: &ExecutorContext<A>,
        _all_items_completed: bool,
    ) -> Result<(), WorkError> {
        Ok(())
    }

    /// Called once all in-flight work of the executor has drained.
    async fn on_stopped(&self, _ctx: &ExecutorContext<A>) -> Result<(), WorkError> {
        Ok(())
    }
}
