//! # Exception-handling policy.
//!
//! [`ExceptionHandling`] decides what happens after a failure:
//!
//! - at **manager** level, when an executor finishes `Unsuccessful`;
//! - at **item** level, when one item of a collection executor fails.
//!
//! ```text
//! Stop      → manager: stop everything (ExecutorExceptionStop)
//!             items:   no new items start, executor unwinds after completion
//! Continue  → manager: wait for the next firing
//!             items:   record the failure, move on to the next item
//! ```

/// Policy controlling the reaction to a failed executor or item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExceptionHandling {
    /// Abort (default).
    #[default]
    Stop,
    /// Record the failure and keep going.
    Continue,
}

impl ExceptionHandling {
    /// Returns `true` for [`ExceptionHandling::Stop`].
    #[inline]
    pub fn stops(self) -> bool {
        matches!(self, ExceptionHandling::Stop)
    }
}
