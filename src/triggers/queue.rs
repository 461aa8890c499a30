//! # Queue-consuming trigger.
//!
//! [`QueueTrigger`] fires once per message received on a tokio `mpsc`
//! channel, passing the message as the executor's args. Messages are consumed
//! one at a time: the next one is received only after the previous firing
//! finished.
//!
//! When every sender is dropped the trigger stops itself and the manager ends
//! with [`StopReason::TriggerStop`](crate::StopReason::TriggerStop).

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{ExecutionState, FireHandle};
use crate::error::TriggerError;
use crate::triggers::Trigger;
use crate::triggers::runtime::TriggerRuntime;

/// Fires per received message.
#[derive(Debug)]
pub struct QueueTrigger<A> {
    receiver: Mutex<Option<mpsc::Receiver<A>>>,
    runtime: Arc<TriggerRuntime>,
}

impl<A: Send + Sync + 'static> QueueTrigger<A> {
    /// Consumes `receiver`.
    pub fn new(receiver: mpsc::Receiver<A>) -> Self {
        Self {
            receiver: Mutex::new(Some(receiver)),
            runtime: Arc::new(TriggerRuntime::new()),
        }
    }

    /// Creates a bounded channel and the trigger consuming it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<A>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl<A: Send + Sync + 'static> Trigger<A> for QueueTrigger<A> {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn start(&self, handle: FireHandle<A>) -> Result<(), TriggerError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut receiver) = receiver else {
            return Err(TriggerError::Start {
                error: "queue receiver already consumed".to_string(),
            });
        };

        self.runtime.launch("queue", handle, |handle, token| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    msg = receiver.recv() => match msg {
                        Some(msg) => {
                            handle.fire(Some(msg)).await;
                        }
                        None => break,
                    },
                }
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
