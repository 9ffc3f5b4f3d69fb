//! The reconciliation model.
//!
//! This module keeps a rendered, ordered view of a data sequence in sync with
//! that sequence through minimal structural edits, and merges the events of
//! every visible item into one stream.
//!
//! # Core Types
//!
//! - `DiffItem`: Identity and content comparison implemented by items
//! - `diff`: Turns an old and a new sequence into an `EditScript`
//! - `AdapterSource`: Owns the sequence and publishes scripts on replacement
//! - `ReconcilingAdapter`: Applies scripts to a pool of render slots
//! - `ItemEvents`: The per-adapter stream of slot-tagged events
//!
//! # Example
//!
//! ```
//! use horizon_reconcile::model::{diff_sequences, EditOp};
//!
//! let script = diff_sequences(&['A', 'B', 'C'], &['B', 'C', 'A'], true);
//! assert_eq!(script.ops(), &[EditOp::Move { from: 0, to: 2 }]);
//! ```
//!
//! # Architecture Overview
//!
//! ```text
//! ┌───────────────┐ edit script ┌────────────────────┐  bind  ┌──────────────┐
//! │ AdapterSource │────────────>│ ReconcilingAdapter │───────>│ RenderUnit   │
//! │  (set_data)   │             │   (slot pool)      │        │ (surface)    │
//! └───────────────┘             └────────────────────┘        └──────────────┘
//!         │ raw sequence                  │ subscribe                │ events
//!         v                               v                          │
//!   application                    ┌────────────┐                    │
//!                                  │ ItemEvents │<───────────────────┘
//!                                  └────────────┘
//! ```

mod adapter;
mod diff;
mod error;
mod events;
mod item;
mod script;
mod slot;
mod source;
mod surface;

pub use adapter::{AdapterConfig, AdapterSignals, ReconcilingAdapter};
pub use diff::{diff, diff_sequences, ValueHashCache};
pub use error::{AdapterError, AdapterResult, EventSourceError, InstantiateError, SlotEventError};
pub use events::{ItemEvent, ItemEvents};
pub use item::{content_hash_of, DiffItem};
pub use script::{EditOp, EditScript, ScriptStats};
pub use slot::{SlotHandle, SlotKey, SlotState};
pub use source::{
    AdapterSource, Classify, Layouts, SimpleAdapterSource, SingleLayout, SourceConfig,
    SourceSignals, TemplateId, VariantLayouts, ViewType,
};
pub use surface::{EventOf, EventResult, RenderSurface, RenderUnit};
