//! # Per-phase arguments.
//!
//! A [`PhaseArgs`] is created by the engine right before a phase runs and
//! handed to the observers right after. Its identity (kind, executor, item)
//! never changes; its error is settable exactly once.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::core::{Executor, ExecutorId};
use crate::error::WorkError;
use crate::phases::Properties;

/// Closed set of executor phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// The single unit of work of a simple executor.
    Run,
    /// Producing the collection of a collection executor.
    CollectionRun,
    /// Enumerating the produced collection (wraps every `ItemRun`).
    CollectionIterate,
    /// Processing one item.
    ItemRun,
    /// The completion step after all items.
    CompletionRun,
}

impl PhaseKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PhaseKind::Run => "run",
            PhaseKind::CollectionRun => "collection_run",
            PhaseKind::CollectionIterate => "collection_iterate",
            PhaseKind::ItemRun => "item_run",
            PhaseKind::CompletionRun => "completion_run",
        }
    }
}

/// Type-erased item of an `ItemRun` phase.
///
/// Observers are shared by every executor of a manager, so they see items
/// through this view: a `Debug` rendering for logs and a typed accessor.
#[derive(Clone)]
pub struct ItemRef {
    index: usize,
    value: Arc<dyn Any + Send + Sync>,
    label: String,
}

impl ItemRef {
    pub(crate) fn new<I>(index: usize, value: Arc<I>) -> Self
    where
        I: fmt::Debug + Send + Sync + 'static,
    {
        let label = format!("{value:?}");
        Self {
            index,
            value,
            label,
        }
    }

    /// Zero-based position of the item in the produced collection.
    pub fn index(&self) -> usize {
        self.index
    }

    /// `Debug` rendering of the item.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the item if it has type `I`.
    pub fn downcast_ref<I: Any>(&self) -> Option<&I> {
        self.value.downcast_ref::<I>()
    }
}

impl fmt::Debug for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemRef")
            .field("index", &self.index)
            .field("label", &self.label)
            .finish()
    }
}

/// Context of one executor phase.
///
/// ### Fields by kind
/// - every kind: executor back-reference, pass-through args, error, properties
/// - `ItemRun`: [`item`](Self::item) (index + value)
/// - `CompletionRun`: [`all_items_completed`](Self::all_items_completed)
pub struct PhaseArgs<A> {
    kind: PhaseKind,
    executor: Arc<Executor<A>>,
    error: OnceLock<Arc<WorkError>>,
    item: Option<ItemRef>,
    all_items_completed: Option<bool>,
}

impl<A: 'static> PhaseArgs<A> {
    pub(crate) fn new(kind: PhaseKind, executor: Arc<Executor<A>>) -> Self {
        Self {
            kind,
            executor,
            error: OnceLock::new(),
            item: None,
            all_items_completed: None,
        }
    }

    pub(crate) fn item_run(executor: Arc<Executor<A>>, item: ItemRef) -> Self {
        let mut args = Self::new(PhaseKind::ItemRun, executor);
        args.item = Some(item);
        args
    }

    pub(crate) fn completion_run(executor: Arc<Executor<A>>, all_items_completed: bool) -> Self {
        let mut args = Self::new(PhaseKind::CompletionRun, executor);
        args.all_items_completed = Some(all_items_completed);
        args
    }

    /// Phase kind.
    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    /// Owning executor.
    pub fn executor(&self) -> &Arc<Executor<A>> {
        &self.executor
    }

    /// Identity of the owning executor.
    pub fn executor_id(&self) -> ExecutorId {
        self.executor.id()
    }

    /// Pass-through arguments of the owning executor.
    pub fn args(&self) -> Option<&A> {
        self.executor.args()
    }

    /// Error captured for this phase, if any.
    pub fn error(&self) -> Option<&Arc<WorkError>> {
        self.error.get()
    }

    /// Returns `true` if this phase captured an error.
    pub fn failed(&self) -> bool {
        self.error.get().is_some()
    }

    /// Executor-wide property bag.
    pub fn properties(&self) -> &Properties {
        self.executor.properties()
    }

    /// Item of an `ItemRun` phase.
    pub fn item(&self) -> Option<&ItemRef> {
        self.item.as_ref()
    }

    /// Completion flag of a `CompletionRun` phase: `true` when every item was
    /// attempted, `false` after an early stop.
    pub fn all_items_completed(&self) -> Option<bool> {
        self.all_items_completed
    }

    /// Records the phase error. The first error wins; later calls are ignored
    /// and return `false`.
    pub(crate) fn set_error(&self, error: Arc<WorkError>) -> bool {
        self.error.set(error).is_ok()
    }
}

impl<A: 'static> fmt::Debug for PhaseArgs<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseArgs")
            .field("kind", &self.kind)
            .field("executor", &self.executor.id())
            .field("error", &self.error.get())
            .field("item", &self.item)
            .field("all_items_completed", &self.all_items_completed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_error_is_set_once() {
        let exec = Arc::new(Executor::<()>::new(None));
        let phase = PhaseArgs::new(PhaseKind::Run, exec);
        assert!(!phase.failed());
        assert!(phase.set_error(Arc::new(WorkError::fail("first"))));
        assert!(!phase.set_error(Arc::new(WorkError::fail("second"))));
        assert_eq!(phase.error().map(|e| e.to_string()).as_deref(), Some("execution failed: first"));
    }

    #[test]
    fn item_ref_downcasts_and_labels() {
        let item = ItemRef::new(3, Arc::new(String::from("row-3")));
        assert_eq!(item.index(), 3);
        assert_eq!(item.label(), "\"row-3\"");
        assert_eq!(item.downcast_ref::<String>().map(String::as_str), Some("row-3"));
        assert!(item.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn completion_phase_carries_flag() {
        let exec = Arc::new(Executor::<u8>::new(Some(Arc::new(7))));
        let phase = PhaseArgs::completion_run(exec, false);
        assert_eq!(phase.kind(), PhaseKind::CompletionRun);
        assert_eq!(phase.all_items_completed(), Some(false));
        assert_eq!(phase.args(), Some(&7));
        assert!(phase.item().is_none());
    }
}
