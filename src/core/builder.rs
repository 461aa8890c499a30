use std::future::Future;
use std::sync::Arc;

use crate::config::ManagerConfig;
use crate::core::ExecutionManager;
use crate::core::collection::CollectionUnit;
use crate::core::unit::{SingleUnit, Unit, UnitFactory};
use crate::error::WorkError;
use crate::observers::{LogObserver, ObserverSet, PhaseObserver};
use crate::triggers::{OnceTrigger, Trigger};
use crate::work::{CollectionWork, ExecutorContext, Work, WorkFn};

/// Builder for constructing an [`ExecutionManager`].
///
/// Defaults: [`OnceTrigger`], no pass-through args, a single
/// [`LogObserver`] following the configured observability.
pub struct ManagerBuilder<A: Send + Sync + 'static> {
    cfg: ManagerConfig,
    trigger: Option<Arc<dyn Trigger<A>>>,
    args: Option<Arc<A>>,
    observers: Option<Vec<Arc<dyn PhaseObserver<A>>>>,
}

impl<A: Send + Sync + 'static> ManagerBuilder<A> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: ManagerConfig) -> Self {
        Self {
            cfg,
            trigger: None,
            args: None,
            observers: None,
        }
    }

    /// Sets the trigger.
    pub fn with_trigger<T: Trigger<A>>(mut self, trigger: Arc<T>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Sets the default pass-through args, used when a firing carries none.
    pub fn with_args(mut self, args: A) -> Self {
        self.args = Some(Arc::new(args));
        self
    }

    /// Replaces the observers (the default [`LogObserver`] included).
    pub fn with_observers(mut self, observers: Vec<Arc<dyn PhaseObserver<A>>>) -> Self {
        self.observers = Some(observers);
        self
    }

    /// Adds one observer next to the default [`LogObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn PhaseObserver<A>>) -> Self {
        let trace = self.cfg.observability.trace_phases;
        self.observers
            .get_or_insert_with(|| vec![default_observer(trace)])
            .push(observer);
        self
    }

    /// Builds a manager running `f` once per firing.
    pub fn build_fn<F, Fut>(self, f: F) -> ExecutionManager<A>
    where
        F: Fn(ExecutorContext<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        let work = Arc::new(WorkFn::new(f));
        self.finish(Arc::new(move || -> anyhow::Result<Box<dyn Unit<A>>> {
            Ok(Box::new(SingleUnit(Arc::clone(&work))))
        }))
    }

    /// Builds a manager creating a fresh [`Work`] per firing.
    ///
    /// A factory error (or panic) stops the manager with
    /// [`StopReason::ExecutionManagerException`](crate::StopReason::ExecutionManagerException).
    pub fn build_work<W, F>(self, factory: F) -> ExecutionManager<A>
    where
        W: Work<A>,
        F: Fn() -> anyhow::Result<W> + Send + Sync + 'static,
    {
        self.finish(Arc::new(move || -> anyhow::Result<Box<dyn Unit<A>>> {
            Ok(Box::new(SingleUnit::new(factory()?)))
        }))
    }

    /// Builds a manager creating a fresh [`CollectionWork`] per firing.
    pub fn build_collection<C, F>(self, factory: F) -> ExecutionManager<A>
    where
        C: CollectionWork<A>,
        F: Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    {
        self.finish(Arc::new(move || -> anyhow::Result<Box<dyn Unit<A>>> {
            Ok(Box::new(CollectionUnit::new(factory()?)))
        }))
    }

    fn finish(self, factory: UnitFactory<A>) -> ExecutionManager<A> {
        let trace = self.cfg.observability.trace_phases;
        let trigger = self
            .trigger
            .unwrap_or_else(|| Arc::new(OnceTrigger::new()) as Arc<dyn Trigger<A>>);
        let observers = self
            .observers
            .unwrap_or_else(|| vec![default_observer(trace)]);

        ExecutionManager::new(
            self.cfg,
            trigger,
            factory,
            self.args,
            Arc::new(ObserverSet::new(observers)),
        )
    }
}

fn default_observer<A: Send + Sync + 'static>(trace_phases: bool) -> Arc<dyn PhaseObserver<A>> {
    Arc::new(LogObserver::with_tracing(trace_phases))
}

impl<A: Send + Sync + 'static> ExecutionManager<A> {
    /// Starts a [`ManagerBuilder`].
    pub fn builder(cfg: ManagerConfig) -> ManagerBuilder<A> {
        ManagerBuilder::new(cfg)
    }

    /// Single-firing manager running `f`, default configuration.
    ///
    /// ## Example
    /// ```no_run
    /// # async fn demo() -> Result<(), taskfire::EngineError> {
    /// use taskfire::{ExecutionManager, ExecutorContext, WorkError};
    ///
    /// let manager = ExecutionManager::from_fn(|_ctx: ExecutorContext<()>| async {
    ///     Ok::<_, WorkError>(())
    /// });
    /// let summary = manager.run().await?;
    /// assert_eq!(summary.executor_count, 1);
    /// # Ok(()) }
    /// ```
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(ExecutorContext<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        ManagerBuilder::new(ManagerConfig::default()).build_fn(f)
    }

    /// Manager running `f` on every firing of `trigger`, default configuration.
    pub fn from_fn_with_trigger<T, F, Fut>(trigger: Arc<T>, f: F) -> Self
    where
        T: Trigger<A>,
        F: Fn(ExecutorContext<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        ManagerBuilder::new(ManagerConfig::default())
            .with_trigger(trigger)
            .build_fn(f)
    }

    /// Single-firing manager over a [`Work`] factory, default configuration.
    pub fn from_work<W, F>(factory: F) -> Self
    where
        W: Work<A>,
        F: Fn() -> anyhow::Result<W> + Send + Sync + 'static,
    {
        ManagerBuilder::new(ManagerConfig::default()).build_work(factory)
    }

    /// Manager over a [`Work`] factory fired by `trigger`, default configuration.
    pub fn from_work_with_trigger<T, W, F>(trigger: Arc<T>, factory: F) -> Self
    where
        T: Trigger<A>,
        W: Work<A>,
        F: Fn() -> anyhow::Result<W> + Send + Sync + 'static,
    {
        ManagerBuilder::new(ManagerConfig::default())
            .with_trigger(trigger)
            .build_work(factory)
    }

    /// Single-firing manager over a [`CollectionWork`] factory, default configuration.
    pub fn from_collection<C, F>(factory: F) -> Self
    where
        C: CollectionWork<A>,
        F: Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    {
        ManagerBuilder::new(ManagerConfig::default()).build_collection(factory)
    }

    /// Manager over a [`CollectionWork`] factory fired by `trigger`, default configuration.
    pub fn from_collection_with_trigger<T, C, F>(trigger: Arc<T>, factory: F) -> Self
    where
        T: Trigger<A>,
        C: CollectionWork<A>,
        F: Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    {
        ManagerBuilder::new(ManagerConfig::default())
            .with_trigger(trigger)
            .build_collection(factory)
    }
}
