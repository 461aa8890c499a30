//! Failure and overlap policies.
//!
//! ## Contents
//! - [`ExceptionHandling`] what a failure does (stop / continue)
//! - [`FiringOverlap`]     whether firings may run side by side
//!
//! ## Quick wiring
//! ```text
//! ManagerConfig { exception_handling, overlap, .. }
//!      └─► core::manager uses:
//!           - exception_handling after every Unsuccessful executor
//!           - overlap to gate firings
//! CollectionOptions { item_exception_handling, .. }
//!      └─► core::collection applies it per item
//! ```

mod exception;
mod overlap;

pub use exception::ExceptionHandling;
pub use overlap::FiringOverlap;
