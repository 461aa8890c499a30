//! # taskfire
//!
//! **Taskfire** is a trigger-driven execution engine for async Rust.
//!
//! A trigger decides *when* work runs; a factory decides *what* runs. Every
//! firing builds a fresh unit of work, wraps it in an [`Executor`] and drives
//! it through observed phases. The [`ExecutionManager`] tracks live
//! executors, escalates their failures and owns a cooperative, draining stop
//! protocol.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────────┐  fire(args)   ┌────────────────────────────────────────┐
//!   │ Trigger          │ ────────────► │ ExecutionManager                       │
//!   │ once / interval  │               │ - factory (fresh work per firing)      │
//!   │ queue / manual   │ ◄──────────── │ - live executors                       │
//!   └──────────────────┘ stop_execution│ - stop reason / error (first wins)     │
//!                                      └──────┬─────────────────────────────────┘
//!                                             ▼
//!                                    ┌──────────────────┐
//!                                    │ Executor         │  NotStarted → Started → Running
//!                                    │ (one per firing) │             → Stopping → Stopped
//!                                    └──────┬───────────┘
//!                                           ▼ phases
//!              Run  |  CollectionRun → CollectionIterate{ItemRun × N} → CompletionRun
//!                                           │
//!                                           ▼
//!                                    ObserverSet ──► LogObserver, user observers
//! ```
//!
//! ### Stop protocol
//! ```text
//! stop signal (ctx.stop / ctx.stop_manager / failure under ExceptionHandling::Stop)
//!   └─► Err(WorkError::Stop) unwinds to the executor root
//!         └─► executor: Stopping ─► wait in-flight work ─► on_stopped ─► Stopped
//!               └─► manager (scope Manager, or failure + policy Stop):
//!                     Stopping ─► trigger.stop_execution ─► stop live executors
//!                     ─► wait until none is live ─► Stopped
//! ```
//!
//! ## Features
//! | Area             | Description                                              | Key types / traits                                  |
//! |------------------|----------------------------------------------------------|-----------------------------------------------------|
//! | **Work**         | Simple and collection units of work.                     | [`Work`], [`WorkFn`], [`CollectionWork`]             |
//! | **Orchestration**| Bind a trigger to a factory, stop cooperatively.         | [`ExecutionManager`], [`ManagerBuilder`]            |
//! | **Triggers**     | Decide when work runs.                                   | [`Trigger`], [`OnceTrigger`], [`IntervalTrigger`], [`QueueTrigger`], [`ManualTrigger`] |
//! | **Observers**    | See every phase of every executor.                       | [`PhaseObserver`], [`LogObserver`], [`PhaseArgs`]    |
//! | **Policies**     | React to failures, serialize firings.                    | [`ExceptionHandling`], [`FiringOverlap`]            |
//! | **Errors**       | Typed errors for work, engine and triggers.              | [`WorkError`], [`EngineError`], [`TriggerError`]    |
//! | **Configuration**| Centralize manager settings.                             | [`ManagerConfig`], [`Observability`]                |
//!
//! ## Example
//! ```rust
//! use taskfire::{ExecutionManager, ExecutorContext, StopReason, WorkError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ExecutionManager::from_fn(|ctx: ExecutorContext<()>| async move {
//!         ctx.properties().insert("greeting", "hello");
//!         Ok::<_, WorkError>(())
//!     });
//!
//!     let summary = manager.run().await?;
//!     assert_eq!(summary.stop_reason, StopReason::TriggerStop);
//!     assert_eq!(summary.executor_count, 1);
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod observers;
mod phases;
mod policies;
mod triggers;
mod work;

// ---- Public re-exports ----

pub use config::{ManagerConfig, Observability, TRACE_PHASES_ENV};
pub use core::{
    ExecutionManager, ExecutionState, Executor, ExecutorBinding, ExecutorId, ExecutorResult,
    ExecutorSnapshot, FireHandle, FireOutcome, ManagerBuilder, PostRunCallback, RunSummary,
    StopReason, StopScope, StoppedCallback,
};
pub use error::{EngineError, TriggerError, WorkError};
pub use observers::{LogObserver, ObserverSet, PhaseObserver};
pub use phases::{ItemRef, PhaseArgs, PhaseKind, Properties};
pub use policies::{ExceptionHandling, FiringOverlap};
pub use triggers::{IntervalTrigger, ManualTrigger, OnceTrigger, QueueTrigger, Trigger};
pub use work::{
    CollectionOptions, CollectionWork, ExecutorContext, ItemStream, Work, WorkFn, item_stream,
};
