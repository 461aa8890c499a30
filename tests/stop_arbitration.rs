use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use taskfire::{
    ExecutionManager, ExecutionState, ExecutorContext, ManagerConfig, ManualTrigger,
    Observability, StopReason,
};

#[derive(Debug, Clone, Copy)]
enum Source {
    ManagerStop,
    Token,
    TriggerFinish,
    WorkStopManager,
}

fn source() -> impl Strategy<Value = Source> {
    prop_oneof![
        Just(Source::ManagerStop),
        Just(Source::Token),
        Just(Source::TriggerFinish),
        Just(Source::WorkStopManager),
    ]
}

fn expected(source: Source) -> StopReason {
    match source {
        Source::ManagerStop => StopReason::ExecutionManagerStop,
        Source::Token => StopReason::ExecutionManagerCancellationTokenStop,
        Source::TriggerFinish => StopReason::TriggerStop,
        Source::WorkStopManager => StopReason::ExecutorStop,
    }
}

/// Fires every source at once against a manager with one live executor and
/// returns the recorded reason, read twice around a late `stop()`.
async fn race(sources: Vec<Source>) -> (StopReason, StopReason, ExecutionState, Vec<StopReason>) {
    let trigger = Arc::new(ManualTrigger::<bool>::new());
    let manager = ExecutionManager::builder(
        ManagerConfig::default().with_observability(Observability::quiet()),
    )
    .with_trigger(Arc::clone(&trigger))
    .build_fn(|ctx: ExecutorContext<bool>| async move {
        if ctx.args().copied().unwrap_or(false) {
            return Err(ctx.stop_manager(None));
        }
        ctx.cancelled().await;
        Ok(())
    });
    let token = CancellationToken::new();

    let runner = tokio::spawn({
        let manager = manager.clone();
        let token = token.clone();
        async move { manager.run_async(token).await }
    });
    trigger.started().await;

    let holder = tokio::spawn({
        let trigger = Arc::clone(&trigger);
        async move { trigger.fire(Some(false)).await }
    });
    while manager.executor_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let allowed: Vec<StopReason> = sources.iter().copied().map(expected).collect();
    let mut racers = Vec::new();
    for source in sources {
        let manager = manager.clone();
        let trigger = Arc::clone(&trigger);
        let token = token.clone();
        racers.push(tokio::spawn(async move {
            match source {
                Source::ManagerStop => manager.stop().await,
                Source::Token => token.cancel(),
                Source::TriggerFinish => trigger.finish(),
                Source::WorkStopManager => {
                    trigger.fire(Some(true)).await;
                }
            }
        }));
    }
    for racer in racers {
        racer.await.expect("racer panicked");
    }

    manager.wait_stopped().await;
    let first = manager.stop_reason();
    manager.stop().await;
    let second = manager.stop_reason();
    let status = manager.status();

    runner
        .await
        .expect("runner panicked")
        .expect("run_async failed");
    holder.await.expect("holder panicked");
    (first, second, status, allowed)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn stop_reason_latches_exactly_once(sources in proptest::collection::vec(source(), 1..10)) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .expect("runtime");
        let (first, second, status, allowed) = rt.block_on(race(sources));

        prop_assert_eq!(status, ExecutionState::Stopped);
        prop_assert_ne!(first, StopReason::NotStopped);
        prop_assert_eq!(first, second);
        prop_assert!(allowed.contains(&first), "{:?} not in {:?}", first, allowed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_stops_agree_on_one_reason() {
    let trigger = Arc::new(ManualTrigger::<()>::new());
    let manager = ExecutionManager::builder(
        ManagerConfig::default().with_observability(Observability::quiet()),
    )
    .with_trigger(Arc::clone(&trigger))
    .build_fn(|ctx: ExecutorContext<()>| async move {
        ctx.cancelled().await;
        Ok(())
    });

    let runner = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run().await }
    });
    trigger.started().await;

    let stops: Vec<_> = (0..32)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager.stop().await;
                manager.stop_reason()
            })
        })
        .collect();

    for stop in stops {
        assert_eq!(
            stop.await.expect("stop task panicked"),
            StopReason::ExecutionManagerStop
        );
    }
    let summary = runner.await.expect("runner panicked").expect("run failed");
    assert_eq!(summary.status, ExecutionState::Stopped);
    assert_eq!(summary.stop_reason, StopReason::ExecutionManagerStop);
}
