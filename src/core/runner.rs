//! # Phase wrapper.
//!
//! [`run_phase`] is the single place where user code runs inside an observed
//! phase:
//!
//! ```text
//! run_phase(exec, phase, policy, fut)
//!   ├─► depth.enter()                      (in-flight until return)
//!   ├─► fut.catch_unwind().await
//!   │     ├─ Ok(v)                 → Ok(Some(v))
//!   │     ├─ Err(Stop{scope,cause})→ phase.error = cause; signal_stop(scope); Err(stop)
//!   │     ├─ Err(e) + Continue     → phase.error = e; Ok(None)
//!   │     ├─ Err(e) + Stop         → phase.error = e; signal_stop(Executor);
//!   │     │                          Err(Stop{Executor, Some(e)})
//!   │     └─ panic                 → treated as Err(Panicked)
//!   └─► observers.notify(phase)            (exactly once, on every path)
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::core::{Executor, StopScope};
use crate::error::{WorkError, panic_message};
use crate::phases::PhaseArgs;
use crate::policies::ExceptionHandling;

/// Runs `fut` as one observed phase of `exec`.
///
/// `Ok(None)` means the phase failed and the policy said to continue.
pub(crate) async fn run_phase<A, T, F>(
    exec: &Arc<Executor<A>>,
    phase: &PhaseArgs<A>,
    policy: ExceptionHandling,
    fut: F,
) -> Result<Option<T>, WorkError>
where
    A: Send + Sync + 'static,
    F: Future<Output = Result<T, WorkError>>,
{
    let outcome = {
        let _depth = exec.depth().enter();
        AssertUnwindSafe(fut)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(WorkError::Panicked {
                    info: panic_message(&*panic),
                })
            })
    };

    let res = match outcome {
        Ok(value) => Ok(Some(value)),
        Err(WorkError::Stop { scope, cause }) => {
            if let Some(cause) = &cause {
                phase.set_error(Arc::clone(cause));
            }
            exec.signal_stop(scope);
            Err(WorkError::Stop { scope, cause })
        }
        Err(error) => {
            let error = Arc::new(error);
            phase.set_error(Arc::clone(&error));
            if policy.stops() {
                exec.signal_stop(StopScope::Executor);
                Err(WorkError::Stop {
                    scope: StopScope::Executor,
                    cause: Some(error),
                })
            } else {
                Ok(None)
            }
        }
    };

    exec.observe(phase);
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExecutionState;
    use crate::observers::{ObserverSet, PhaseObserver};
    use crate::phases::PhaseKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(PhaseKind, bool)>>,
    }

    impl PhaseObserver<()> for Recorder {
        fn on_phase(&self, phase: &PhaseArgs<()>) {
            self.seen
                .lock()
                .unwrap()
                .push((phase.kind(), phase.failed()));
        }
    }

    fn bound(recorder: &Arc<Recorder>) -> Arc<Executor<()>> {
        let exec = Arc::new(Executor::new(None));
        let obs: Arc<dyn PhaseObserver<()>> = recorder.clone();
        exec.configure(crate::core::ExecutorBinding::new(Arc::new(
            ObserverSet::new(vec![obs]),
        )))
        .unwrap();
        exec
    }

    #[tokio::test]
    async fn success_yields_value_and_notifies_once() {
        let rec = Arc::new(Recorder::default());
        let exec = bound(&rec);
        let phase = PhaseArgs::new(PhaseKind::Run, Arc::clone(&exec));

        let out = run_phase(&exec, &phase, ExceptionHandling::Stop, async {
            Ok::<_, WorkError>(5)
        })
        .await
        .unwrap();

        assert_eq!(out, Some(5));
        assert_eq!(*rec.seen.lock().unwrap(), vec![(PhaseKind::Run, false)]);
        assert_eq!(exec.depth().current(), 0);
    }

    #[tokio::test]
    async fn continue_policy_records_and_swallows() {
        let rec = Arc::new(Recorder::default());
        let exec = bound(&rec);
        let phase = PhaseArgs::new(PhaseKind::ItemRun, Arc::clone(&exec));

        let out = run_phase(&exec, &phase, ExceptionHandling::Continue, async {
            Err::<(), _>(WorkError::fail("bad item"))
        })
        .await
        .unwrap();

        assert!(out.is_none());
        assert!(phase.failed());
        assert!(!exec.is_stop_requested());
        assert_eq!(*rec.seen.lock().unwrap(), vec![(PhaseKind::ItemRun, true)]);
    }

    #[tokio::test]
    async fn stop_policy_converts_failure_into_stop_signal() {
        let rec = Arc::new(Recorder::default());
        let exec = bound(&rec);
        let phase = PhaseArgs::new(PhaseKind::Run, Arc::clone(&exec));

        let err = run_phase(&exec, &phase, ExceptionHandling::Stop, async {
            Err::<(), _>(WorkError::fail("boom"))
        })
        .await
        .unwrap_err();

        match err {
            WorkError::Stop { scope, cause } => {
                assert_eq!(scope, StopScope::Executor);
                assert_eq!(cause.unwrap().to_string(), "execution failed: boom");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(exec.is_stop_requested());
    }

    #[tokio::test]
    async fn panics_are_captured_as_failures() {
        let rec = Arc::new(Recorder::default());
        let exec = bound(&rec);
        let phase = PhaseArgs::new(PhaseKind::Run, Arc::clone(&exec));

        let out = run_phase(&exec, &phase, ExceptionHandling::Continue, async {
            if phase.kind() == PhaseKind::Run {
                panic!("kaboom");
            }
            Ok::<(), WorkError>(())
        })
        .await
        .unwrap();

        assert!(out.is_none());
        assert_eq!(phase.error().unwrap().as_label(), "work_panicked");
        assert_eq!(exec.depth().current(), 0);
        assert_eq!(exec.state(), ExecutionState::NotStarted);
    }
}
