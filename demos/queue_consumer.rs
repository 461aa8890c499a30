//! # Example: queue_consumer
//!
//! A long-lived manager fed by a tokio channel, stopped from the outside
//! with a cancellation token.
//!
//! Demonstrates how to:
//! - Bind a [`QueueTrigger`] so that every message becomes one executor.
//! - Keep the manager alive across failed firings with `ExceptionHandling::Continue`.
//! - Stop it cooperatively through the token passed to `run_async`.
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example queue_consumer
//! ```

use std::sync::Arc;
use std::time::Duration;

use taskfire::{
    ExceptionHandling, ExecutionManager, ExecutorContext, ManagerConfig, QueueTrigger, WorkError,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Order {
    id: u32,
    amount: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (orders, trigger) = QueueTrigger::<Order>::channel(16);
    let manager = ExecutionManager::builder(
        ManagerConfig::default().with_exception_handling(ExceptionHandling::Continue),
    )
    .with_trigger(Arc::new(trigger))
    .build_fn(|ctx: ExecutorContext<Order>| async move {
        let Some(order) = ctx.args() else {
            return Ok(());
        };
        if order.amount < 0 {
            return Err(WorkError::fail(format!("order {} has a negative amount", order.id)));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        println!("[{}] booked order {} ({})", ctx.id(), order.id, order.amount);
        Ok(())
    });

    let token = CancellationToken::new();
    let runner = tokio::spawn({
        let manager = manager.clone();
        let token = token.clone();
        async move { manager.run_async(token).await }
    });

    for (id, amount) in [(1, 120), (2, -5), (3, 40)] {
        orders.send(Order { id, amount }).await?;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();

    let summary = runner.await??;
    println!(
        "consumer stopped: reason={:?} executors={}",
        summary.stop_reason, summary.executor_count
    );
    Ok(())
}
