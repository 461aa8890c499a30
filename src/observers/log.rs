//! # Default phase observer.
//!
//! Emits a `tracing` event for every failed phase; with tracing enabled, also
//! a `debug` event for every phase.
//!
//! ## Example output
//! ```text
//! WARN taskfire::observers::log: phase failed executor=exec-4 phase="item_run" item=Some(3) error=execution failed: bad row
//! DEBUG taskfire::observers::log: phase finished executor=exec-4 phase="completion_run" all_items_completed=Some(true)
//! ```

use crate::observers::PhaseObserver;
use crate::phases::PhaseArgs;

/// Logs phases through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver {
    trace_phases: bool,
}

impl LogObserver {
    /// Logs failed phases only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs failed phases, and every phase when `trace_phases` is set.
    #[must_use]
    pub fn with_tracing(trace_phases: bool) -> Self {
        Self { trace_phases }
    }
}

impl<A: 'static> PhaseObserver<A> for LogObserver {
    fn on_phase(&self, phase: &PhaseArgs<A>) {
        let index = phase.item().map(|i| i.index());
        match phase.error() {
            Some(error) => tracing::warn!(
                executor = %phase.executor_id(),
                phase = phase.kind().as_label(),
                item = ?index,
                error = %error,
                "phase failed"
            ),
            None if self.trace_phases => tracing::debug!(
                executor = %phase.executor_id(),
                phase = phase.kind().as_label(),
                item = ?index,
                all_items_completed = ?phase.all_items_completed(),
                "phase finished"
            ),
            None => {}
        }
    }

    fn name(&self) -> &'static str {
        "LogObserver"
    }
}
