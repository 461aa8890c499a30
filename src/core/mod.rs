//! Runtime core: executors, managers and their lifecycle.
//!
//! Internal modules:
//! - [`state`]: lifecycle states, verdicts, stop reasons and executor ids;
//! - [`depth`]: per-executor wait group of in-flight work;
//! - [`runner`]: runs one observed phase and applies the exception policy;
//! - [`unit`]: seam between an executor and the user's work;
//! - [`executor`]: one firing's lifecycle, from `NotStarted` to `Stopped`;
//! - [`collection`]: produce → iterate → complete driver;
//! - [`manager`]: trigger binding, live executors, stop protocol;
//! - [`builder`]: manager construction.

mod builder;
mod collection;
mod depth;
mod executor;
mod manager;
mod runner;
mod state;
mod unit;

pub use builder::ManagerBuilder;
pub use executor::{
    Executor, ExecutorBinding, ExecutorSnapshot, PostRunCallback, StoppedCallback,
};
pub use manager::{ExecutionManager, FireHandle, FireOutcome, RunSummary};
pub use state::{ExecutionState, ExecutorId, ExecutorResult, StopReason, StopScope};

pub(crate) use executor::ExecutorOutcome;
