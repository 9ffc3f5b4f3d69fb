//! Prelude module for Horizon Reconcile.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use horizon_reconcile::prelude::*;
//! ```

// ============================================================================
// Signal/Slot System
// ============================================================================

pub use crate::{ConnectionGuard, ConnectionId, Signal};

// ============================================================================
// Items and Diffing
// ============================================================================

pub use crate::model::{diff, diff_sequences, DiffItem, EditOp, EditScript, ValueHashCache};

// ============================================================================
// Data Sources
// ============================================================================

pub use crate::model::{
    AdapterSource, Classify, Layouts, SimpleAdapterSource, SingleLayout, SourceConfig,
    TemplateId, VariantLayouts, ViewType,
};

// ============================================================================
// Adapter, Slots and Events
// ============================================================================

pub use crate::model::{
    AdapterConfig, AdapterError, AdapterResult, EventResult, EventSourceError, InstantiateError,
    ItemEvent, ReconcilingAdapter, RenderSurface, RenderUnit, SlotHandle, SlotState,
};
