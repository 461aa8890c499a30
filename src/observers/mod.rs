//! # Phase observers.
//!
//! Observers receive the [`PhaseArgs`](crate::PhaseArgs) of every phase of
//! every executor of a manager, after the phase finished.
//!
//! ## Architecture
//! ```text
//! run-wrapper ── phase over ──► ObserverSet::notify(&PhaseArgs)
//!                                   │
//!                                   ├──► observer1.on_phase()  (panic caught, logged)
//!                                   ├──► observer2.on_phase()
//!                                   └──► LogObserver (default)
//! ```
//!
//! ## Rules
//! - Called synchronously, in phase order, for a single executor.
//! - Parallel items of one executor may notify concurrently.
//! - A panicking observer is logged and skipped; engine state is never touched.

mod log;
mod observer;
mod set;

pub use log::LogObserver;
pub use observer::PhaseObserver;
pub use set::ObserverSet;
