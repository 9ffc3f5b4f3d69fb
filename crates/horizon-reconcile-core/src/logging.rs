//! Logging facilities for Horizon Reconcile.
//!
//! Horizon Reconcile uses the `tracing` crate for instrumentation. Every log
//! line and span carries one of the targets below, so a host can filter the
//! engine's output per subsystem. To see logs, install a tracing subscriber in
//! your application:
//!
//! ```ignore
//! use tracing_subscriber::EnvFilter;
//!
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter(EnvFilter::new("horizon_reconcile::adapter=debug"))
//!         .init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Event-source failures are always logged at `error` level on
//! [`targets::EVENTS`]; that log line is the observability sink for slot
//! subscriptions torn down by a failing source.

/// Span names used throughout Horizon Reconcile for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// Diff computation span.
    pub const DIFF: &str = "horizon_reconcile::diff";
    /// Edit script application span.
    pub const APPLY: &str = "horizon_reconcile::apply";
    /// Layout (bind/attach of visible slots) span.
    pub const LAYOUT: &str = "horizon_reconcile::layout";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_reconcile_core::signal";
    /// Diff engine target.
    pub const DIFF: &str = "horizon_reconcile::diff";
    /// Data source target.
    pub const SOURCE: &str = "horizon_reconcile::source";
    /// Reconciling adapter target.
    pub const ADAPTER: &str = "horizon_reconcile::adapter";
    /// Slot lifecycle target.
    pub const SLOT: &str = "horizon_reconcile::slot";
    /// Event multiplexer target.
    pub const EVENTS: &str = "horizon_reconcile::events";
    /// Performance spans opened by [`PerfSpan`](super::PerfSpan).
    pub const PERF: &str = "horizon_reconcile::perf";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// This is useful for tracking the duration of a `set_data` round trip or a
/// layout pass.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
