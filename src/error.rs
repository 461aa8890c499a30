//! Error types used by the taskfire engine, its triggers and user work.
//!
//! This module defines three enums:
//!
//! - [`WorkError`]: failures raised by user work during a phase, plus the
//!   internal stop signal used to unwind a stop request to the executor root.
//! - [`EngineError`]: errors raised by the orchestration engine itself
//!   (misuse, construction failures, trigger and post-run failures).
//! - [`TriggerError`]: failures reported by a [`Trigger`](crate::Trigger).
//!
//! All of them provide an `as_label` helper for logs/metrics.

use std::sync::Arc;

use thiserror::Error;

use crate::core::{ExecutionState, StopScope};

/// # Errors produced by user work.
///
/// Every phase of an executor returns `Result<_, WorkError>`. Ordinary
/// failures are recorded on the phase and handled per the active
/// [`ExceptionHandling`](crate::ExceptionHandling) policy.
///
/// [`WorkError::Stop`] is not a failure: it is the stop signal produced by
/// [`ExecutorContext::stop`](crate::ExecutorContext::stop) and
/// [`ExecutorContext::stop_manager`](crate::ExecutorContext::stop_manager).
/// Returning it (directly or through `?`) unwinds the executor from any depth.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkError {
    /// Work failed with a message.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Work panicked; the panic was caught at the phase boundary.
    #[error("work panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Enumerating a produced collection failed (not a specific item).
    #[error("collection iteration failed: {error}")]
    CollectionIterate {
        /// The underlying error message.
        error: String,
    },

    /// Stop signal unwinding to the executor root.
    #[error("stop requested ({scope:?})")]
    Stop {
        /// Whether only this executor or the whole manager should stop.
        scope: StopScope,
        /// Caller-supplied reason for stopping, if any.
        cause: Option<Arc<WorkError>>,
    },

    /// Any other error raised by user code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkError {
    /// Shorthand for [`WorkError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkError::Fail {
            error: error.into(),
        }
    }

    /// Returns `true` for the internal stop signal.
    pub fn is_stop_signal(&self) -> bool {
        matches!(self, WorkError::Stop { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskfire::WorkError;
    ///
    /// assert_eq!(WorkError::fail("boom").as_label(), "work_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Panicked { .. } => "work_panicked",
            WorkError::CollectionIterate { .. } => "collection_iterate_failed",
            WorkError::Stop { .. } => "stop_signal",
            WorkError::Other(_) => "work_error",
        }
    }
}

/// # Errors produced by the engine.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// An operation was attempted in a state that does not allow it.
    #[error("invalid state for {operation}: {reason} (state={state:?})")]
    InvalidState {
        /// Operation that was rejected.
        operation: &'static str,
        /// Why it was rejected.
        reason: &'static str,
        /// State observed when the operation was rejected.
        state: ExecutionState,
    },

    /// The executor factory failed or panicked.
    #[error("executor construction failed: {error}")]
    Construction {
        /// The underlying error message.
        error: String,
    },

    /// The trigger failed to start or reported an error while stopping.
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// The post-run callback of a successful executor failed.
    #[error("post-run callback failed: {error}")]
    PostRun {
        /// The underlying error message.
        error: String,
    },

    /// An executor finished with a captured error.
    #[error("executor failed: {error}")]
    Executor {
        /// The error captured by the executor.
        error: Arc<WorkError>,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::InvalidState { .. } => "engine_invalid_state",
            EngineError::Construction { .. } => "engine_construction_failed",
            EngineError::Trigger(_) => "engine_trigger_failed",
            EngineError::PostRun { .. } => "engine_post_run_failed",
            EngineError::Executor { .. } => "engine_executor_failed",
        }
    }
}

/// # Errors produced by triggers.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TriggerError {
    /// The trigger could not be started.
    #[error("trigger failed to start: {error}")]
    Start {
        /// The underlying error message.
        error: String,
    },

    /// The trigger's firing source failed.
    #[error("trigger source failed: {error}")]
    Source {
        /// The underlying error message.
        error: String,
    },
}

impl TriggerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TriggerError::Start { .. } => "trigger_start_failed",
            TriggerError::Source { .. } => "trigger_source_failed",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_signal_is_not_a_failure_label() {
        let stop = WorkError::Stop {
            scope: StopScope::Executor,
            cause: None,
        };
        assert!(stop.is_stop_signal());
        assert_eq!(stop.as_label(), "stop_signal");
        assert!(!WorkError::fail("x").is_stop_signal());
    }

    #[test]
    fn anyhow_errors_convert_into_work_errors() {
        fn produce() -> Result<(), WorkError> {
            Err(anyhow::anyhow!("disk gone"))?;
            Ok(())
        }
        let err = produce().unwrap_err();
        assert_eq!(err.as_label(), "work_error");
        assert_eq!(err.to_string(), "disk gone");
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        let s: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*s), "static");
        let s: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*s), "owned");
        let s: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*s), "unknown panic");
    }
}
