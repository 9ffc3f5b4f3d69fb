//! Contracts for the rendering surface.
//!
//! The engine never draws anything. It asks a [`RenderSurface`] to turn a
//! [`TemplateId`] into a [`RenderUnit`], and tells units which item they show.
//! A unit may expose an item-scoped event source, a [`Signal`] carrying
//! [`EventResult`]s, which the adapter subscribes to while the unit's slot is
//! attached.

use horizon_reconcile_core::Signal;

use super::error::{EventSourceError, InstantiateError};
use super::source::TemplateId;

/// What an event source emits: an event, or a failure that ends the subscription.
pub type EventResult<E> = Result<E, EventSourceError>;

/// One renderable unit held by a slot.
pub trait RenderUnit<T> {
    /// Payload of the events this unit produces. Use `()` for units without events.
    type Event: Clone + 'static;

    /// Displays `item` at `position`.
    ///
    /// May be called again with a different item; the unit must fully replace
    /// whatever it showed before.
    fn bind(&mut self, item: &T, position: usize);

    /// The unit's event source, if it has one.
    ///
    /// Must return the same signal for the lifetime of the unit.
    fn event_source(&self) -> Option<&Signal<EventResult<Self::Event>>> {
        None
    }

    /// Called after `bind` and whenever a detached slot is attached again.
    fn subscribe_item(&mut self, _item: &T) {}

    /// Called when the slot's item is cleared by detach or recycle.
    fn unsubscribe_item(&mut self) {}

    /// Called when the slot goes back to the pool.
    fn recycled(&mut self) {}
}

/// Factory for render units.
pub trait RenderSurface<T> {
    /// The unit type this surface builds.
    type Unit: RenderUnit<T>;

    /// Builds a unit from a template.
    ///
    /// A failure is treated as permanent for every view type that maps to the
    /// template: the adapter does not ask again.
    fn instantiate(&mut self, template: TemplateId) -> Result<Self::Unit, InstantiateError>;
}

impl<T, U, F> RenderSurface<T> for F
where
    U: RenderUnit<T>,
    F: FnMut(TemplateId) -> Result<U, InstantiateError>,
{
    type Unit = U;

    fn instantiate(&mut self, template: TemplateId) -> Result<U, InstantiateError> {
        self(template)
    }
}

/// Payload type of the units a surface builds.
pub type EventOf<T, S> = <<S as RenderSurface<T>>::Unit as RenderUnit<T>>::Event;
