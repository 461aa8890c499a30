//! # Periodic trigger.
//!
//! [`IntervalTrigger`] fires on a fixed period.
//!
//! - By default a firing is awaited before the next tick, so runs never
//!   overlap and late ticks are delayed.
//! - With `overlapping(true)` every tick fires on its own task.
//! - With `max_runs(n)` the trigger stops itself after `n` successful runs,
//!   counted through `on_run_completed`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::core::{ExecutionState, ExecutorId, FireHandle};
use crate::error::TriggerError;
use crate::triggers::Trigger;
use crate::triggers::runtime::TriggerRuntime;

/// Fires every `period`.
#[derive(Debug)]
pub struct IntervalTrigger {
    period: Duration,
    overlapping: bool,
    max_runs: Option<u64>,
    completed: AtomicU64,
    runtime: Arc<TriggerRuntime>,
}

impl IntervalTrigger {
    /// Fires every `period`, first tick immediately.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            overlapping: false,
            max_runs: None,
            completed: AtomicU64::new(0),
            runtime: Arc::new(TriggerRuntime::new()),
        }
    }

    /// Fires each tick on its own task instead of awaiting the previous run.
    pub fn overlapping(mut self, overlapping: bool) -> Self {
        self.overlapping = overlapping;
        self
    }

    /// Stops after `runs` successful runs.
    pub fn max_runs(mut self, runs: u64) -> Self {
        self.max_runs = Some(runs);
        self
    }

    /// Successful runs counted so far.
    pub fn completed_runs(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl<A: Send + Sync + 'static> Trigger<A> for IntervalTrigger {
    fn name(&self) -> &'static str {
        "interval"
    }

    async fn start(&self, handle: FireHandle<A>) -> Result<(), TriggerError> {
        if self.period.is_zero() {
            return Err(TriggerError::Start {
                error: "interval period must be non-zero".to_string(),
            });
        }
        let period = self.period;
        let overlapping = self.overlapping;

        self.runtime.launch("interval", handle, move |handle, token| async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut inflight = JoinSet::new();

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    Some(_) = inflight.join_next(), if !inflight.is_empty() => continue,
                    _ = ticker.tick() => {}
                }
                if overlapping {
                    let handle = handle.clone();
                    inflight.spawn(async move {
                        handle.fire(None).await;
                    });
                } else {
                    handle.fire(None).await;
                }
            }

            while inflight.join_next().await.is_some() {}
            Ok(())
        })
    }

    async fn stop_execution(&self, wait: bool) {
        self.runtime.stop(wait).await
    }

    fn state(&self) -> ExecutionState {
        self.runtime.state()
    }

    fn error(&self) -> Option<TriggerError> {
        self.runtime.error()
    }

    fn on_run_completed(&self, executor: ExecutorId) -> Result<(), TriggerError> {
        let runs = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if self.max_runs.is_some_and(|max| runs >= max) {
            tracing::debug!(executor = %executor, runs, "interval trigger reached its run limit");
            self.runtime.finish();
        }
        Ok(())
    }
}
