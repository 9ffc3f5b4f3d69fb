//! Error types for Horizon Reconcile.

/// The main error type for Horizon Reconcile core operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// A positional read was made past the end of a sequence.
    #[error("Position {position} is out of range for a sequence of length {len}")]
    PositionOutOfRange {
        /// The requested position.
        position: usize,
        /// The length of the sequence at the time of the read.
        len: usize,
    },
}

/// A specialized Result type for Horizon Reconcile core operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
