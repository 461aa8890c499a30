//! # Manager configuration.
//!
//! Provides [`ManagerConfig`], the settings an
//! [`ExecutionManager`](crate::ExecutionManager) is built with, and
//! [`Observability`], the phase-tracing switch.
//!
//! ## Process-wide default
//! `Observability::default()` reads `TASKFIRE_TRACE_PHASES` (`1`/`true`/`yes`/`on`)
//! once, when the config is constructed. Nothing reads it afterwards, so a
//! running manager never changes behaviour under your feet.

use crate::policies::{ExceptionHandling, FiringOverlap};

/// Environment variable holding the process-wide phase-tracing default.
pub const TRACE_PHASES_ENV: &str = "TASKFIRE_TRACE_PHASES";

/// Phase-tracing options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observability {
    /// Log every phase at `debug` (not only failed ones).
    pub trace_phases: bool,
}

impl Observability {
    /// Tracing disabled regardless of the environment.
    pub const fn quiet() -> Self {
        Self {
            trace_phases: false,
        }
    }

    /// Tracing enabled regardless of the environment.
    pub const fn verbose() -> Self {
        Self { trace_phases: true }
    }

    fn from_env() -> Self {
        let trace_phases = std::env::var(TRACE_PHASES_ENV)
            .ok()
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        Self { trace_phases }
    }
}

impl Default for Observability {
    /// Reads [`TRACE_PHASES_ENV`] once.
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Configuration for an execution manager.
///
/// ## Field semantics
/// - `exception_handling`: reaction to an executor that finishes `Unsuccessful`
/// - `overlap`: whether firings may overlap while an executor is live
/// - `observability`: phase tracing for the default log observer
#[derive(Clone, Debug, Default)]
pub struct ManagerConfig {
    /// What an `Unsuccessful` executor does to the manager.
    ///
    /// - `Stop` → the manager stops with `ExecutorExceptionStop`
    /// - `Continue` → the manager waits for the next firing
    pub exception_handling: ExceptionHandling,

    /// Overlap policy for firings.
    pub overlap: FiringOverlap,

    /// Phase tracing.
    pub observability: Observability,
}

impl ManagerConfig {
    /// Returns a config with the given exception handling.
    pub fn with_exception_handling(mut self, handling: ExceptionHandling) -> Self {
        self.exception_handling = handling;
        self
    }

    /// Returns a config with the given overlap policy.
    pub fn with_overlap(mut self, overlap: FiringOverlap) -> Self {
        self.overlap = overlap;
        self
    }

    /// Returns a config with the given observability options.
    pub fn with_observability(mut self, observability: Observability) -> Self {
        self.observability = observability;
        self
    }

    /// Returns `true` when firings must not overlap.
    #[inline]
    pub fn serializes_firings(&self) -> bool {
        matches!(self.overlap, FiringOverlap::Serialize)
    }
}
