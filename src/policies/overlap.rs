//! # Overlapping firings.
//!
//! A trigger may fire again while the executor of a previous firing is still
//! running or draining. [`FiringOverlap`] makes that choice explicit:
//!
//! - [`FiringOverlap::Allow`]: every firing gets its executor immediately; the
//!   live-executor map may hold several entries.
//! - [`FiringOverlap::Serialize`]: a firing waits until the previous executor
//!   has stopped before its own executor is created.

/// Policy for firings that arrive while another executor is live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FiringOverlap {
    /// Run overlapping firings side by side (default).
    #[default]
    Allow,
    /// Run one executor at a time, in firing order.
    Serialize,
}
