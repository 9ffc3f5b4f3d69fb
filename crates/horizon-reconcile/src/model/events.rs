//! The event multiplexer.
//!
//! Every attached slot whose unit has an event source gets exactly one
//! subscription. Events arriving on it are tagged with the slot's
//! [`SlotHandle`] and re-emitted on one shared [`Signal`] per adapter. The
//! subscription is closed when the slot is detached, rebound or recycled, or
//! when its source reports an error.
//!
//! An [`ItemEvent`] does not hold the item. It resolves the item lazily
//! through the slot handle, so an event that outlives its slot's binding
//! resolves to `None` instead of to whatever the slot shows now.
//!
//! # Example
//!
//! ```ignore
//! adapter.events().events().connect(|event| {
//!     match event.item() {
//!         Some(item) => println!("clicked {item:?} at {:?}", event.position()),
//!         None => println!("slot was recycled before the click was handled"),
//!     }
//! });
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crossbeam_channel::{Receiver, Sender};
use horizon_reconcile_core::logging::targets;
use horizon_reconcile_core::{ConnectionGuard, Signal};
use slotmap::SecondaryMap;

use super::error::{AdapterError, AdapterResult, EventSourceError, SlotEventError};
use super::slot::{Bindings, SlotHandle, SlotKey};
use super::surface::EventResult;

/// An event from one slot, tagged with a weak reference to that slot.
pub struct ItemEvent<T, E> {
    slot: SlotHandle,
    payload: E,
    bindings: Weak<Bindings<T>>,
}

impl<T: Clone, E> ItemEvent<T, E> {
    /// The originating slot.
    pub fn slot(&self) -> SlotHandle {
        self.slot
    }

    /// The payload produced by the unit.
    pub fn payload(&self) -> &E {
        &self.payload
    }

    /// Consumes the event, returning its payload.
    pub fn into_payload(self) -> E {
        self.payload
    }

    /// The item the slot shows, or `None` if the slot was detached or recycled
    /// since the event was emitted.
    pub fn item(&self) -> Option<T> {
        self.bindings.upgrade()?.item(self.slot)
    }

    /// Like [`item`](Self::item), but reports a stale slot as an error.
    pub fn require_item(&self) -> AdapterResult<T> {
        self.item()
            .ok_or(AdapterError::StaleSlot { slot: self.slot })
    }

    /// The slot's current position, or `None` if the slot was recycled.
    pub fn position(&self) -> Option<usize> {
        self.bindings.upgrade()?.position(self.slot)
    }

    /// Returns `true` if the event no longer resolves to an item.
    pub fn is_stale(&self) -> bool {
        self.item().is_none()
    }
}

impl<T, E: Clone> Clone for ItemEvent<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot,
            payload: self.payload.clone(),
            bindings: Weak::clone(&self.bindings),
        }
    }
}

impl<T, E: std::fmt::Debug> std::fmt::Debug for ItemEvent<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemEvent")
            .field("slot", &self.slot)
            .field("payload", &self.payload)
            .finish()
    }
}

struct Subscription {
    generation: u32,
    _guard: ConnectionGuard,
}

/// The per-adapter event stream.
pub struct ItemEvents<T, E> {
    events: Signal<ItemEvent<T, E>>,
    errors: Signal<SlotEventError>,
    bindings: Rc<Bindings<T>>,
    subscriptions: RefCell<SecondaryMap<SlotKey, Subscription>>,
    senders: RefCell<Vec<Sender<ItemEvent<T, E>>>>,
}

impl<T, E> ItemEvents<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub(crate) fn new(bindings: Rc<Bindings<T>>) -> Rc<Self> {
        Rc::new(Self {
            events: Signal::new(),
            errors: Signal::new(),
            bindings,
            subscriptions: RefCell::new(SecondaryMap::new()),
            senders: RefCell::new(Vec::new()),
        })
    }

    /// Emitted for every event from every attached slot.
    ///
    /// Events from one slot arrive in the order that slot produced them.
    pub fn events(&self) -> &Signal<ItemEvent<T, E>> {
        &self.events
    }

    /// Emitted when a slot's event source fails and its subscription is closed.
    pub fn errors(&self) -> &Signal<SlotEventError> {
        &self.errors
    }

    /// Opens a queue that receives a copy of every subsequent event.
    ///
    /// The queue is meant to be drained on the thread that owns the adapter.
    /// Dropping the receiver closes it.
    pub fn channel(&self) -> Receiver<ItemEvent<T, E>> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.senders.borrow_mut().push(sender);
        receiver
    }

    /// Number of open slot subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Returns `true` if the slot currently has an open subscription.
    pub fn is_subscribed(&self, key: SlotKey) -> bool {
        self.subscriptions.borrow().contains_key(key)
    }

    pub(crate) fn bindings(&self) -> &Rc<Bindings<T>> {
        &self.bindings
    }

    /// Subscribes to a slot's event source, replacing any previous subscription.
    pub(crate) fn subscribe(self: &Rc<Self>, slot: SlotHandle, source: &Signal<EventResult<E>>) {
        self.unsubscribe(slot.key());

        let weak = Rc::downgrade(self);
        let guard = source.connect_scoped(move |result: &EventResult<E>| {
            let Some(events) = weak.upgrade() else {
                return;
            };
            match result {
                Ok(payload) => events.forward(slot, payload.clone()),
                Err(error) => events.fail(slot, error.clone()),
            }
        });
        self.subscriptions.borrow_mut().insert(
            slot.key(),
            Subscription {
                generation: slot.generation(),
                _guard: guard,
            },
        );
        tracing::trace!(target: targets::EVENTS, ?slot, "slot subscribed");
    }

    /// Closes a slot's subscription. Returns `true` if one was open.
    pub(crate) fn unsubscribe(&self, key: SlotKey) -> bool {
        let removed = self.subscriptions.borrow_mut().remove(key);
        match removed {
            Some(subscription) => {
                drop(subscription);
                tracing::trace!(target: targets::EVENTS, ?key, "slot unsubscribed");
                true
            }
            None => false,
        }
    }

    fn forward(&self, slot: SlotHandle, payload: E) {
        let event = ItemEvent {
            slot,
            payload,
            bindings: Rc::downgrade(&self.bindings),
        };

        {
            let mut senders = self.senders.borrow_mut();
            if !senders.is_empty() {
                senders.retain(|sender| sender.send(event.clone()).is_ok());
            }
        }
        self.events.emit(event);
    }

    fn fail(&self, slot: SlotHandle, error: EventSourceError) {
        let removed = {
            let mut subscriptions = self.subscriptions.borrow_mut();
            let current = subscriptions
                .get(slot.key())
                .is_some_and(|subscription| subscription.generation == slot.generation());
            if current {
                subscriptions.remove(slot.key())
            } else {
                None
            }
        };
        drop(removed);

        tracing::error!(
            target: targets::EVENTS,
            ?slot,
            %error,
            "event source failed, slot subscription closed"
        );
        self.errors.emit(SlotEventError { slot, error });
    }
}

impl<T, E> std::fmt::Debug for ItemEvents<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemEvents")
            .field("subscriptions", &self.subscriptions.borrow().len())
            .field("channels", &self.senders.borrow().len())
            .finish()
    }
}
