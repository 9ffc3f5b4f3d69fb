//! Core systems for Horizon Reconcile.
//!
//! This crate provides the foundational pieces the reconcile engine is built
//! on:
//!
//! - **Signal/Slot System**: Single-thread publish/subscribe channels with
//!   scoped connection guards
//! - **Errors**: The shared error and result types
//! - **Logging**: `tracing` targets and span names for each subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_reconcile_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

mod error;
pub mod logging;
pub mod signal;

pub use error::{ReconcileError, Result};
pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
