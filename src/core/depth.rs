//! # Call-depth wait group.
//!
//! Counts the in-flight units of work of one executor (phases, items,
//! tracked spawns). A stop request finalizes only after the count has fallen
//! back to zero.
//!
//! ```text
//! run_phase ─► enter() ─► DepthGuard ─► ... ─► drop ─► depth -= 1 ─► (0?) notify
//! finalize  ─► wait_zero().await  (returns immediately when already 0)
//! ```
//!
//! ## Rules
//! - [`DepthGuard`] pops on drop, so early returns, errors and panics all unwind it.
//! - `wait_zero` registers interest **before** reading the counter, so a
//!   concurrent drop to zero is never missed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counter of in-flight work with an async "reached zero" wait.
#[derive(Debug, Default)]
pub struct DepthTracker {
    depth: AtomicUsize,
    zero: Notify,
}

impl DepthTracker {
    /// Creates a tracker at depth zero.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pushes a depth marker; the returned guard pops it.
    pub fn enter(self: &Arc<Self>) -> DepthGuard {
        self.depth.fetch_add(1, Ordering::AcqRel);
        DepthGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Current depth.
    pub fn current(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Waits until the depth is zero.
    pub async fn wait_zero(&self) {
        loop {
            let notified = self.zero.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Pops one depth marker on drop.
#[derive(Debug)]
pub struct DepthGuard {
    tracker: Arc<DepthTracker>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        if self.tracker.depth.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.zero.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_zero_returns_immediately_when_idle() {
        let t = DepthTracker::new();
        tokio::time::timeout(Duration::from_millis(50), t.wait_zero())
            .await
            .expect("idle tracker must not block");
    }

    #[tokio::test]
    async fn wait_zero_waits_for_every_guard() {
        let t = DepthTracker::new();
        let outer = t.enter();
        let inner = t.enter();
        assert_eq!(t.current(), 2);

        let waiter = {
            let t = Arc::clone(&t);
            tokio::spawn(async move { t.wait_zero().await })
        };

        drop(inner);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(outer);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must wake")
            .expect("waiter must not panic");
        assert_eq!(t.current(), 0);
    }
}
