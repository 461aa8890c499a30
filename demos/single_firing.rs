//! # Example: single_firing
//!
//! One firing of a closure, passing args and properties through the phases.
//!
//! Demonstrates how to:
//! - Build a manager from a closure with [`ExecutionManager::builder`].
//! - Read pass-through args and write properties from inside the work.
//! - Inspect the [`RunSummary`](taskfire::RunSummary) after the trigger finished.
//!
//! ## Flow
//! ```text
//! OnceTrigger ──► fire(None)
//!     └─► Executor: NotStarted → Started → Running
//!           ├─► Run phase (closure)
//!           └─► Stopping → Stopped (Successful)
//! OnceTrigger ──► trigger_stopped ──► manager Stopped (TriggerStop)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug TASKFIRE_TRACE_PHASES=1 cargo run --example single_firing
//! ```

use taskfire::{ExecutionManager, ExecutorContext, ManagerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Greeting {
    name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let manager = ExecutionManager::builder(ManagerConfig::default())
        .with_args(Greeting {
            name: "world".into(),
        })
        .build_fn(|ctx: ExecutorContext<Greeting>| async move {
            let name = ctx.args().map(|g| g.name.as_str()).unwrap_or("nobody");
            println!("[{}] hello, {name}", ctx.id());
            ctx.properties().insert("greeted", name.to_string());
            Ok(())
        });

    let summary = manager.run().await?;
    println!(
        "stopped: reason={:?} executors={}",
        summary.stop_reason, summary.executor_count
    );
    Ok(())
}
