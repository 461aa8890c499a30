//! # Triggers.
//!
//! A trigger decides when its manager fires:
//! - [`OnceTrigger`] - one firing, then stop (the default)
//! - [`IntervalTrigger`] - fixed period, optional overlap and run limit
//! - [`QueueTrigger`] - one firing per message of a tokio `mpsc` channel
//! - [`ManualTrigger`] - fired by application code
//!
//! Custom triggers implement [`Trigger`] and drive the manager through a
//! [`FireHandle`](crate::FireHandle).

mod interval;
mod manual;
mod once;
mod queue;
mod runtime;
mod trigger;

pub use interval::IntervalTrigger;
pub use manual::ManualTrigger;
pub use once::OnceTrigger;
pub use queue::QueueTrigger;
pub use trigger::Trigger;
