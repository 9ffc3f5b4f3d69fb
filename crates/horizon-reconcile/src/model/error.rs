//! Error types for the model layer.

use horizon_reconcile_core::ReconcileError;

use super::slot::{SlotHandle, SlotKey, SlotState};
use super::source::{TemplateId, ViewType};

/// A rendering surface could not build a unit from a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InstantiateError {
    message: String,
}

impl InstantiateError {
    /// Creates an error with a human-readable reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The reason reported by the surface.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An item-scoped event source failed.
///
/// Reporting one of these ends the subscription of the slot it came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EventSourceError {
    message: String,
}

impl EventSourceError {
    /// Creates an error with a human-readable reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The reason reported by the event source.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Record published when a slot's event source fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event source of slot {slot:?} failed: {error}")]
pub struct SlotEventError {
    /// The slot whose subscription was closed.
    pub slot: SlotHandle,
    /// What the source reported.
    pub error: EventSourceError,
}

/// Errors raised by the reconciling adapter and its slots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The surface failed to instantiate a template. Fatal for the view type.
    #[error("failed to instantiate template {template:?} for view type {view_type:?}: {source}")]
    Instantiate {
        /// The view type that needed a slot.
        view_type: ViewType,
        /// The template that failed.
        template: TemplateId,
        /// The surface's error.
        source: InstantiateError,
    },
    /// The layouts have no template for a view type. Fatal for the view type.
    #[error("no template registered for view type {view_type:?}")]
    TemplateUnavailable {
        /// The unresolved view type.
        view_type: ViewType,
    },
    /// The handle refers to a slot that was recycled or no longer holds an item.
    #[error("slot {slot:?} no longer refers to a bound item")]
    StaleSlot {
        /// The stale handle.
        slot: SlotHandle,
    },
    /// The key does not belong to any live slot.
    #[error("unknown slot {key:?}")]
    UnknownSlot {
        /// The unknown key.
        key: SlotKey,
    },
    /// A lifecycle call was made from a state that does not allow it.
    #[error("cannot {action} a slot in state {state:?}")]
    InvalidTransition {
        /// The attempted lifecycle step.
        action: &'static str,
        /// The slot's state at the time.
        state: SlotState,
    },
    /// An edit script did not fit the adapter's view of the sequence.
    #[error("edit script expects {actual} items but the adapter holds {expected}")]
    ScriptMismatch {
        /// Item count known to the adapter.
        expected: usize,
        /// Item count the script applies to.
        actual: usize,
    },
    /// Core error, such as a read past the end of the sequence.
    #[error(transparent)]
    Core(#[from] ReconcileError),
}

/// A specialized Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;
