use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use taskfire::{
    CollectionOptions, CollectionWork, ExceptionHandling, ExecutionManager, ExecutorContext,
    ExecutorResult, ItemStream, ManagerConfig, Observability, PhaseArgs, PhaseKind,
    PhaseObserver, StopReason, WorkError, item_stream,
};

type TestResult = Result<(), Box<dyn Error>>;

#[derive(Default)]
struct Journal {
    started: Mutex<Vec<u32>>,
    completed_with: Mutex<Option<bool>>,
}

struct Batch {
    items: Vec<u32>,
    fail: Vec<u32>,
    delay: Duration,
    options: CollectionOptions,
    journal: Arc<Journal>,
}

#[async_trait]
impl CollectionWork<()> for Batch {
    type Item = u32;

    fn options(&self) -> CollectionOptions {
        self.options
    }

    async fn produce(&self, ctx: &ExecutorContext<()>) -> Result<ItemStream<u32>, WorkError> {
        ctx.properties().insert("produced", self.items.len());
        Ok(item_stream(self.items.clone()))
    }

    async fn process(
        &self,
        _ctx: &ExecutorContext<()>,
        _index: usize,
        item: &u32,
    ) -> Result<(), WorkError> {
        self.journal.started.lock().unwrap().push(*item);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.contains(item) {
            return Err(WorkError::fail(format!("item {item} rejected")));
        }
        Ok(())
    }

    async fn complete(
        &self,
        ctx: &ExecutorContext<()>,
        all_items_completed: bool,
    ) -> Result<(), WorkError> {
        assert_eq!(ctx.properties().get::<usize>("produced").as_deref(), Some(&self.items.len()));
        *self.journal.completed_with.lock().unwrap() = Some(all_items_completed);
        Ok(())
    }
}

#[derive(Default)]
struct PhaseTrail(Mutex<Vec<(PhaseKind, Option<usize>, bool)>>);

impl PhaseObserver<()> for PhaseTrail {
    fn on_phase(&self, phase: &PhaseArgs<()>) {
        self.0.lock().unwrap().push((
            phase.kind(),
            phase.item().map(|i| i.index()),
            phase.failed(),
        ));
    }
}

fn manager_for(
    batch: impl Fn() -> Batch + Send + Sync + 'static,
    handling: ExceptionHandling,
    trail: Arc<PhaseTrail>,
) -> ExecutionManager<()> {
    ExecutionManager::<()>::builder(
        ManagerConfig::default()
            .with_exception_handling(handling)
            .with_observability(Observability::quiet()),
    )
    .with_observer(trail)
    .build_collection(move || Ok(batch()))
}

#[tokio::test]
async fn continue_attempts_all_items_and_reports_failures() -> TestResult {
    let journal = Arc::new(Journal::default());
    let trail = Arc::new(PhaseTrail::default());
    let j = Arc::clone(&journal);
    let manager = manager_for(
        move || Batch {
            items: (1..=10).collect(),
            fail: vec![3, 7],
            delay: Duration::ZERO,
            options: CollectionOptions::sequential()
                .with_item_exception_handling(ExceptionHandling::Continue),
            journal: Arc::clone(&j),
        },
        ExceptionHandling::Stop,
        Arc::clone(&trail),
    );

    let summary = manager.run().await?;

    assert_eq!(*journal.started.lock().unwrap(), (1..=10).collect::<Vec<_>>());
    assert_eq!(*journal.completed_with.lock().unwrap(), Some(true));
    assert_eq!(summary.stop_reason, StopReason::TriggerStop);
    assert_eq!(
        manager.last_executor().map(|e| e.result),
        Some(ExecutorResult::Successful)
    );

    let trail = trail.0.lock().unwrap();
    let failed: Vec<usize> = trail
        .iter()
        .filter(|(kind, _, failed)| *kind == PhaseKind::ItemRun && *failed)
        .filter_map(|(_, index, _)| *index)
        .collect();
    assert_eq!(failed, vec![2, 6]);
    Ok(())
}

#[tokio::test]
async fn stop_short_circuits_sequential_items() -> TestResult {
    let journal = Arc::new(Journal::default());
    let trail = Arc::new(PhaseTrail::default());
    let j = Arc::clone(&journal);
    let manager = manager_for(
        move || Batch {
            items: (1..=10).collect(),
            fail: vec![3],
            delay: Duration::ZERO,
            options: CollectionOptions::sequential(),
            journal: Arc::clone(&j),
        },
        ExceptionHandling::Stop,
        trail,
    );

    let summary = manager.run().await?;

    assert_eq!(*journal.started.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(*journal.completed_with.lock().unwrap(), Some(false));
    assert_eq!(summary.stop_reason, StopReason::ExecutorExceptionStop);
    Ok(())
}

#[tokio::test]
async fn phases_are_observed_in_protocol_order() -> TestResult {
    let journal = Arc::new(Journal::default());
    let trail = Arc::new(PhaseTrail::default());
    let j = Arc::clone(&journal);
    let manager = manager_for(
        move || Batch {
            items: vec![10, 20, 30],
            fail: vec![],
            delay: Duration::ZERO,
            options: CollectionOptions::sequential(),
            journal: Arc::clone(&j),
        },
        ExceptionHandling::Stop,
        Arc::clone(&trail),
    );

    manager.run().await?;

    let kinds: Vec<(PhaseKind, Option<usize>)> = trail
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|(kind, index, _)| (*kind, *index))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (PhaseKind::CollectionRun, None),
            (PhaseKind::ItemRun, Some(0)),
            (PhaseKind::ItemRun, Some(1)),
            (PhaseKind::ItemRun, Some(2)),
            (PhaseKind::CollectionIterate, None),
            (PhaseKind::CompletionRun, None),
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn parallel_cap_bounds_wall_clock() -> TestResult {
    let journal = Arc::new(Journal::default());
    let j = Arc::clone(&journal);
    let manager = manager_for(
        move || Batch {
            items: (0..20).collect(),
            fail: vec![],
            delay: Duration::from_millis(50),
            options: CollectionOptions::parallel(Some(2)),
            journal: Arc::clone(&j),
        },
        ExceptionHandling::Stop,
        Arc::new(PhaseTrail::default()),
    );

    let started = tokio::time::Instant::now();
    manager.run().await?;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(500), "too fast: {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(600), "serialized: {elapsed:?}");
    assert_eq!(journal.started.lock().unwrap().len(), 20);
    assert_eq!(*journal.completed_with.lock().unwrap(), Some(true));
    Ok(())
}

enum StopFrom {
    Manager,
    Token,
}

/// Runs ten 20ms items, stops the manager from outside after 50ms and
/// returns how many items started and the completion flag.
async fn stop_midway(
    options: CollectionOptions,
    from: StopFrom,
) -> Result<(usize, Option<bool>, StopReason), Box<dyn Error>> {
    let journal = Arc::new(Journal::default());
    let j = Arc::clone(&journal);
    let manager = manager_for(
        move || Batch {
            items: (0..10).collect(),
            fail: vec![],
            delay: Duration::from_millis(20),
            options,
            journal: Arc::clone(&j),
        },
        ExceptionHandling::Stop,
        Arc::new(PhaseTrail::default()),
    );
    let token = CancellationToken::new();

    let runner = tokio::spawn({
        let manager = manager.clone();
        let token = token.clone();
        async move { manager.run_async(token).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    match from {
        StopFrom::Manager => manager.stop().await,
        StopFrom::Token => token.cancel(),
    }

    let summary = runner.await??;
    assert!(manager.live_executors().is_empty());
    let started = journal.started.lock().unwrap().len();
    let completed_with = *journal.completed_with.lock().unwrap();
    Ok((started, completed_with, summary.stop_reason))
}

#[tokio::test(start_paused = true)]
async fn manager_stop_halts_sequential_items() -> TestResult {
    let (started, completed_with, reason) =
        stop_midway(CollectionOptions::sequential(), StopFrom::Manager).await?;

    assert_eq!(started, 3);
    assert_eq!(completed_with, Some(false));
    assert_eq!(reason, StopReason::ExecutionManagerStop);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn manager_stop_halts_parallel_items() -> TestResult {
    let (started, completed_with, reason) =
        stop_midway(CollectionOptions::parallel(Some(2)), StopFrom::Manager).await?;

    assert!(started >= 6 && started < 10, "unexpected started count {started}");
    assert_eq!(completed_with, Some(false));
    assert_eq!(reason, StopReason::ExecutionManagerStop);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancellation_token_halts_parallel_items() -> TestResult {
    let (started, completed_with, reason) =
        stop_midway(CollectionOptions::parallel(Some(2)), StopFrom::Token).await?;

    assert!(started < 10, "unexpected started count {started}");
    assert_eq!(completed_with, Some(false));
    assert_eq!(reason, StopReason::ExecutionManagerCancellationTokenStop);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn full_execution_survives_manager_stop() -> TestResult {
    for options in [
        CollectionOptions::sequential(),
        CollectionOptions::parallel(Some(2)),
    ] {
        let (started, completed_with, reason) = stop_midway(
            options.with_complete_full_execution_on_stop(true),
            StopFrom::Manager,
        )
        .await?;

        assert_eq!(started, 10);
        assert_eq!(completed_with, Some(true));
        assert_eq!(reason, StopReason::ExecutionManagerStop);
    }
    Ok(())
}

struct Peak {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_stop_lets_in_flight_items_finish() -> TestResult {
    struct Fanout {
        gauge: Arc<Peak>,
        finished: Arc<AtomicUsize>,
        completed_with: Arc<Mutex<Option<bool>>>,
    }

    #[async_trait]
    impl CollectionWork<()> for Fanout {
        type Item = u32;

        fn options(&self) -> CollectionOptions {
            CollectionOptions::parallel(Some(3))
        }

        async fn produce(&self, _ctx: &ExecutorContext<()>) -> Result<ItemStream<u32>, WorkError> {
            Ok(item_stream(0..30u32))
        }

        async fn process(
            &self,
            ctx: &ExecutorContext<()>,
            _index: usize,
            item: &u32,
        ) -> Result<(), WorkError> {
            let now = self.gauge.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.gauge.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.gauge.active.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
            if *item == 4 {
                return Err(ctx.stop(None));
            }
            Ok(())
        }

        async fn complete(
            &self,
            _ctx: &ExecutorContext<()>,
            all_items_completed: bool,
        ) -> Result<(), WorkError> {
            *self.completed_with.lock().unwrap() = Some(all_items_completed);
            Ok(())
        }
    }

    let gauge = Arc::new(Peak {
        active: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let finished = Arc::new(AtomicUsize::new(0));
    let completed_with = Arc::new(Mutex::new(None));
    let (g, f, c) = (Arc::clone(&gauge), Arc::clone(&finished), Arc::clone(&completed_with));

    let manager = ExecutionManager::builder(
        ManagerConfig::default().with_observability(Observability::quiet()),
    )
    .build_collection(move || {
        Ok(Fanout {
            gauge: Arc::clone(&g),
            finished: Arc::clone(&f),
            completed_with: Arc::clone(&c),
        })
    });

    let summary = manager.run().await?;

    let done = finished.load(Ordering::SeqCst);
    assert!(done >= 5 && done < 30, "unexpected finished count {done}");
    assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(gauge.active.load(Ordering::SeqCst), 0);
    assert_eq!(*completed_with.lock().unwrap(), Some(false));
    assert_eq!(summary.stop_reason, StopReason::TriggerStop);
    assert_eq!(
        manager.last_executor().map(|e| e.result),
        Some(ExecutorResult::Successful)
    );
    Ok(())
}
