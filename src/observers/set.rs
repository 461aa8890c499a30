//! # Panic-isolated observer fan-out.
//!
//! Provides [`ObserverSet`]: delivers each finished phase to every observer in
//! registration order.
//!
//! ## Panic handling
//! Each call is wrapped in `catch_unwind`:
//! - the panic is logged with the observer name,
//! - the remaining observers still run,
//! - executor/manager state is untouched.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if an observer uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::panic_message;
use crate::observers::PhaseObserver;
use crate::phases::PhaseArgs;

/// Ordered set of phase observers.
pub struct ObserverSet<A> {
    observers: Vec<Arc<dyn PhaseObserver<A>>>,
}

impl<A: 'static> ObserverSet<A> {
    /// Creates a set from the given observers.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn PhaseObserver<A>>>) -> Self {
        Self { observers }
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if the set has no observers.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Notifies every observer; panics are logged and swallowed.
    pub fn notify(&self, phase: &PhaseArgs<A>) {
        for observer in &self.observers {
            let res = catch_unwind(AssertUnwindSafe(|| observer.on_phase(phase)));
            if let Err(panic) = res {
                tracing::error!(
                    observer = observer.name(),
                    executor = %phase.executor_id(),
                    phase = phase.kind().as_label(),
                    info = %panic_message(&*panic),
                    "phase observer panicked"
                );
            }
        }
    }
}

impl<A: 'static> Default for ObserverSet<A> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Executor;
    use crate::phases::PhaseKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Exploding;

    impl PhaseObserver<()> for Exploding {
        fn on_phase(&self, _phase: &PhaseArgs<()>) {
            panic!("observer bug");
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl PhaseObserver<()> for Counting {
        fn on_phase(&self, _phase: &PhaseArgs<()>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn panicking_observer_does_not_stop_the_others() {
        let counting = Arc::new(Counting::default());
        let set: ObserverSet<()> = ObserverSet::new(vec![Arc::new(Exploding), counting.clone()]);
        let phase = PhaseArgs::new(PhaseKind::Run, Arc::new(Executor::new(None)));

        set.notify(&phase);
        set.notify(&phase);

        assert_eq!(counting.0.load(Ordering::SeqCst), 2);
        assert_eq!(set.len(), 2);
    }
}
