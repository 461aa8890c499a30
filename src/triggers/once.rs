//! Single-firing trigger.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{ExecutionState, FireHandle};
use crate::error::TriggerError;
use crate::triggers::Trigger;
use crate::triggers::runtime::TriggerRuntime;

/// Fires exactly once, then reports itself stopped.
///
/// The manager ends with [`StopReason::TriggerStop`](crate::StopReason::TriggerStop)
/// unless the executor escalated first.
#[derive(Debug)]
pub struct OnceTrigger {
    runtime: Arc<TriggerRuntime>,
}

impl OnceTrigger {
    /// Creates the trigger.
    pub fn new() -> Self {
        Self {
            runtime: Arc::new(TriggerRuntime::new()),
        }
    }
}

impl Default for OnceTrigger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A: Send + Sync + 'static> Trigger<A> for OnceTrigger {
    fn name(&self) -> &'static str {
        "once"
    }

    async fn start(&self, handle: FireHandle<A>) -> Result<(), TriggerError> {
        self.runtime.launch("once", handle, |handle, token| async move {
            if !token.is_cancelled() {
                handle.fire(None).await;
            }
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
}
