//! Signal/slot system for Horizon Reconcile.
//!
//! This module provides a type-safe, Qt-inspired signal/slot mechanism used by
//! every channel in the reconcile engine: the data source's edit-script and
//! raw-sequence channels, the per-unit event sources, and the multiplexed item
//! event stream.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The main signal type for emitting notifications
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects exactly once when dropped
//!
//! # Threading
//!
//! All reconcile work happens on the thread that owns the rendering surface,
//! so signals are single-threaded: slots are plain `Fn(&Args)` closures held
//! behind `Rc`, and a `Signal` is neither `Send` nor `Sync`. There is no
//! queued delivery; every emission invokes the connected slots immediately.
//! Slots connected to a signal that never had a disconnection run in
//! connection order; after a disconnection, new slots may reuse freed entries.
//!
//! # Re-entrancy
//!
//! A slot may connect or disconnect slots (including itself) and may emit
//! other signals while it runs. Emission works on a snapshot of the
//! connections taken when `emit` starts; a slot disconnected during an
//! emission is skipped if it has not run yet.
//!
//! # Example
//!
//! ```
//! use horizon_reconcile_core::Signal;
//!
//! // Create a signal that passes a string argument
//! let text_changed = Signal::<String>::new();
//!
//! // Connect a slot (closure)
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! // Emit the signal
//! text_changed.emit("Hello, World!".to_string());
//!
//! // Disconnect when done
//! text_changed.disconnect(conn_id);
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    /// The ID remains valid until the connection is explicitly disconnected or
    /// the signal is dropped.
    ///
    /// # Related
    ///
    /// - [`Signal::connect`] - Returns a `ConnectionId`
    /// - [`Signal::disconnect`] - Removes a connection by ID
    /// - [`ConnectionGuard`] - RAII alternative that auto-disconnects
    pub struct ConnectionId;
}

type SlotFn<Args> = Rc<dyn Fn(&Args)>;

/// Shared connection table.
///
/// Kept behind an `Rc` so that [`ConnectionGuard`]s can hold a weak handle to
/// it instead of a raw pointer to the signal.
struct Connections<Args> {
    slots: RefCell<SlotMap<ConnectionId, SlotFn<Args>>>,
}

/// A type-safe signal that can have multiple connected slots.
///
/// When a signal is emitted, all connected slots are invoked with a reference
/// to the provided arguments.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a tuple like `(usize, usize)` for multiple arguments.
///
/// # Related Types
///
/// - [`ConnectionId`] - Returned by [`connect`](Self::connect), used to disconnect
/// - [`ConnectionGuard`] - RAII-style connection that auto-disconnects on drop
pub struct Signal<Args> {
    /// All active connections.
    connections: Rc<Connections<Args>>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Rc::new(Connections {
                slots: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    ///
    /// # Example
    ///
    /// ```
    /// use horizon_reconcile_core::Signal;
    ///
    /// let signal = Signal::<String>::new();
    /// let id = signal.connect(|s| println!("Got: {}", s));
    /// signal.emit("Hello".to_string());
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + 'static,
    {
        let id = self.connections.slots.borrow_mut().insert(Rc::new(slot));
        tracing::trace!(target: targets::SIGNAL, ?id, "slot connected");
        id
    }

    /// Connect a slot with automatic disconnection when the guard is dropped.
    ///
    /// The guard only holds a weak handle to the connection table, so it is
    /// safe to drop it after the signal itself is gone.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard
    where
        F: Fn(&Args) + 'static,
    {
        let id = self.connect(slot);
        let weak: Weak<Connections<Args>> = Rc::downgrade(&self.connections);
        ConnectionGuard {
            id,
            release: Some(Box::new(move |id| match weak.upgrade() {
                Some(connections) => {
                    let removed = connections.slots.borrow_mut().remove(id);
                    removed.is_some()
                }
                None => false,
            })),
        }
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.slots.borrow_mut().remove(id).is_some()
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.slots.borrow().len()
    }

    /// Returns `true` if the given connection is still active.
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.slots.borrow().contains_key(id)
    }

    /// Emit the signal, invoking all connected slots.
    ///
    /// Every slot that was connected when the emission started, and is still
    /// connected when its turn comes, is invoked with a reference to `args`.
    pub fn emit(&self, args: Args) {
        // Snapshot so slots can connect/disconnect while we iterate
        let snapshot: Vec<(ConnectionId, SlotFn<Args>)> = self
            .connections
            .slots
            .borrow()
            .iter()
            .map(|(id, slot)| (id, Rc::clone(slot)))
            .collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = snapshot.len(), "emitting signal");

        for (id, slot) in snapshot {
            if !self.is_connected(id) {
                continue;
            }
            slot(&args);
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.slots.borrow().len())
            .finish()
    }
}

/// A connection guard that disconnects its slot when dropped.
///
/// This is the scoped subscription handle used for every per-slot event
/// subscription: it is released exactly once, either explicitly through
/// [`release`](Self::release) or implicitly on drop. Created via
/// [`Signal::connect_scoped`].
///
/// # Example
///
/// ```
/// use horizon_reconcile_core::Signal;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let signal = Signal::<i32>::new();
/// let counter = Rc::new(Cell::new(0));
/// {
///     let counter_clone = counter.clone();
///     let _guard = signal.connect_scoped(move |&n| {
///         counter_clone.set(counter_clone.get() + n);
///     });
///     signal.emit(42);  // counter = 42
/// }
/// signal.emit(43);  // Nothing happens - connection was dropped
/// assert_eq!(counter.get(), 42);
/// ```
pub struct ConnectionGuard {
    id: ConnectionId,
    release: Option<Box<dyn FnOnce(ConnectionId) -> bool>>,
}

impl ConnectionGuard {
    /// The connection this guard owns.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` until the guard has been released.
    pub fn is_armed(&self) -> bool {
        self.release.is_some()
    }

    /// Disconnect now instead of on drop.
    ///
    /// Returns `true` if a live connection was removed. Calling this more
    /// than once is harmless; only the first call does anything.
    pub fn release(&mut self) -> bool {
        match self.release.take() {
            Some(release) => release(self.id),
            None => false,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("id", &self.id)
            .field("armed", &self.is_armed())
            .finish()
    }
}

static_assertions::assert_not_impl_any!(Signal<()>: Send, Sync);
static_assertions::assert_not_impl_any!(ConnectionGuard: Send, Sync);
