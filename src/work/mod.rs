//! # Unit-of-work contracts.
//!
//! This module provides what user code implements and sees:
//! - [`Work`] - a simple unit of work (`on_started` → `run` → `on_stopped`)
//! - [`WorkFn`] - closure-backed [`Work`]
//! - [`CollectionWork`] - produce a collection, process every item, complete
//! - [`CollectionOptions`] - parallelism and per-item failure policy
//! - [`ExecutorContext`] - handle passed to every call: args, properties,
//!   stop signals, cancellation

mod collection;
mod context;
mod work;
mod work_fn;

pub use collection::{CollectionOptions, CollectionWork, ItemStream, item_stream};
pub use context::ExecutorContext;
pub use work::Work;
pub use work_fn::WorkFn;
