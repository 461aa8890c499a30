//! # Run-type arguments.
//!
//! Every phase of every executor is described by a [`PhaseArgs`] value that
//! the run-wrapper hands to the [phase observers](crate::PhaseObserver) once
//! the phase is over, success or failure.
//!
//! ```text
//! simple executor:      Run
//! collection executor:  CollectionRun ─► CollectionIterate ┬─► ItemRun #0
//!                                                          ├─► ItemRun #1 ...
//!                                                          └─► CompletionRun
//! ```
//!
//! - [`PhaseKind`]  closed set of phases
//! - [`PhaseArgs`]  per-phase context (executor, args, error, properties, item)
//! - [`ItemRef`]    type-erased view of the item of an `ItemRun`
//! - [`Properties`] per-executor bag for passing data across phases

mod args;
mod properties;

pub use args::{ItemRef, PhaseArgs, PhaseKind};
pub use properties::Properties;
