//! # Phase observer trait.
//!
//! Provides [`PhaseObserver`], the extension point for cross-cutting
//! concerns (structured logging, metrics, audit) that must see every phase.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use taskfire::{PhaseArgs, PhaseObserver};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicUsize);
//!
//! impl<A: 'static> PhaseObserver<A> for FailureCounter {
//!     fn on_phase(&self, phase: &PhaseArgs<A>) {
//!         if phase.failed() {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use crate::phases::PhaseArgs;

/// Observer of executor phases.
///
/// ### Implementation requirements
/// - Keep it cheap and side-effect free (logging, counters): it runs inline
///   on the executor's task.
/// - Do not block; do not panic. Panics are caught and logged, never
///   propagated.
pub trait PhaseObserver<A>: Send + Sync + 'static {
    /// Handles one finished phase.
    fn on_phase(&self, phase: &PhaseArgs<A>);

    /// Returns the observer name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
