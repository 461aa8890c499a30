//! # Example: collection_fanout
//!
//! A collection executor that processes items in parallel with a cap, keeps
//! going past failed items and reports the batch in its completion phase.
//!
//! ## Flow
//! ```text
//! CollectionRun      produce() ──► 12 items
//! CollectionIterate  ItemRun × 12, at most 4 at a time
//!                    items 5 and 9 fail (ExceptionHandling::Continue)
//! CompletionRun      complete(all_items_completed = true)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example collection_fanout
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use taskfire::{
    CollectionOptions, CollectionWork, ExceptionHandling, ExecutionManager, ExecutorContext,
    ItemStream, ManagerConfig, WorkError, item_stream,
};
use tracing_subscriber::EnvFilter;

struct Thumbnails {
    done: AtomicUsize,
}

#[async_trait]
impl CollectionWork<()> for Thumbnails {
    type Item = String;

    fn options(&self) -> CollectionOptions {
        CollectionOptions::parallel(Some(4))
            .with_item_exception_handling(ExceptionHandling::Continue)
    }

    async fn produce(&self, _ctx: &ExecutorContext<()>) -> Result<ItemStream<String>, WorkError> {
        Ok(item_stream((1..=12).map(|i| format!("photo-{i:02}.jpg"))))
    }

    async fn process(
        &self,
        ctx: &ExecutorContext<()>,
        index: usize,
        item: &String,
    ) -> Result<(), WorkError> {
        tokio::time::sleep(Duration::from_millis(40)).await;
        if index == 4 || index == 8 {
            return Err(WorkError::fail(format!("{item}: corrupt header")));
        }
        self.done.fetch_add(1, Ordering::Relaxed);
        println!("[{}] resized {item}", ctx.id());
        Ok(())
    }

    async fn complete(
        &self,
        _ctx: &ExecutorContext<()>,
        all_items_completed: bool,
    ) -> Result<(), WorkError> {
        println!(
            "batch finished: resized={} all_attempted={all_items_completed}",
            self.done.load(Ordering::Relaxed)
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let manager = ExecutionManager::builder(ManagerConfig::default()).build_collection(|| {
        Ok(Thumbnails {
            done: AtomicUsize::new(0),
        })
    });

    let summary = manager.run().await?;
    println!("manager stopped: {:?}", summary.stop_reason);
    Ok(())
}
