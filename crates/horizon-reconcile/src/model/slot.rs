//! Slots and the slot pool.
//!
//! A slot owns one [`RenderUnit`] and moves through these states:
//!
//! ```text
//!            bind             attach
//! Created ────────> Bound ────────────> Attached
//!    ^                ^                  │  ^
//!    │                │ bind       detach│  │attach
//!    │                │                  v  │
//!    └────────── recycle ─────────── Detached
//! ```
//!
//! Recycling is allowed from every state and returns the slot to the pool of
//! its template. Each recycle bumps the slot's generation, so a
//! [`SlotHandle`] taken before the recycle no longer resolves.
//!
//! The item a slot shows lives in a bindings table shared with the event
//! multiplexer. Events carry only a weak reference to that table plus a
//! handle, so resolving an event never keeps a slot or an item alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use horizon_reconcile_core::logging::targets;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

use super::error::{AdapterError, AdapterResult};
use super::events::ItemEvents;
use super::source::{TemplateId, ViewType};
use super::surface::RenderUnit;

new_key_type! {
    /// Key of a slot in the adapter's pool.
    pub struct SlotKey;
}

/// A weak reference to a slot at one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    key: SlotKey,
    generation: u32,
}

impl SlotHandle {
    pub(crate) fn new(key: SlotKey, generation: u32) -> Self {
        Self { key, generation }
    }

    /// The slot's key.
    pub fn key(&self) -> SlotKey {
        self.key
    }

    /// The generation the handle was taken at.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Lifecycle state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Instantiated or recycled; holds no item.
    Created,
    /// Holds an item; no event subscription.
    Bound,
    /// Holds an item and has an open event subscription (if its unit has a source).
    Attached,
    /// Off screen; item cleared, subscription closed.
    Detached,
}

#[derive(Debug)]
struct Binding<T> {
    generation: u32,
    item: Option<T>,
    position: Option<usize>,
}

/// Slot-to-item table shared between the pool and emitted events.
#[derive(Debug)]
pub(crate) struct Bindings<T> {
    entries: RefCell<SecondaryMap<SlotKey, Binding<T>>>,
}

impl<T: Clone> Bindings<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(SecondaryMap::new()),
        }
    }

    /// The item bound to `handle`, if the slot is still at that generation.
    pub(crate) fn item(&self, handle: SlotHandle) -> Option<T> {
        let entries = self.entries.borrow();
        let binding = entries.get(handle.key)?;
        if binding.generation != handle.generation {
            return None;
        }
        binding.item.clone()
    }

    /// The position of `handle`, if the slot is still at that generation.
    pub(crate) fn position(&self, handle: SlotHandle) -> Option<usize> {
        let entries = self.entries.borrow();
        let binding = entries.get(handle.key)?;
        if binding.generation != handle.generation {
            return None;
        }
        binding.position
    }

    fn insert(&self, key: SlotKey) {
        self.entries.borrow_mut().insert(
            key,
            Binding {
                generation: 0,
                item: None,
                position: None,
            },
        );
    }

    fn remove(&self, key: SlotKey) {
        self.entries.borrow_mut().remove(key);
    }

    fn has_item(&self, key: SlotKey) -> bool {
        self.entries
            .borrow()
            .get(key)
            .is_some_and(|binding| binding.item.is_some())
    }

    fn raw_item(&self, key: SlotKey) -> Option<T> {
        self.entries
            .borrow()
            .get(key)
            .and_then(|binding| binding.item.clone())
    }

    fn raw_position(&self, key: SlotKey) -> Option<usize> {
        self.entries.borrow().get(key).and_then(|binding| binding.position)
    }

    fn set(&self, key: SlotKey, item: Option<T>, position: Option<usize>) {
        if let Some(binding) = self.entries.borrow_mut().get_mut(key) {
            binding.item = item;
            binding.position = position;
        }
    }

    fn set_item(&self, key: SlotKey, item: Option<T>) {
        if let Some(binding) = self.entries.borrow_mut().get_mut(key) {
            binding.item = item;
        }
    }

    fn set_position(&self, key: SlotKey, position: Option<usize>) {
        if let Some(binding) = self.entries.borrow_mut().get_mut(key) {
            binding.position = position;
        }
    }

    fn advance(&self, key: SlotKey, generation: u32) {
        if let Some(binding) = self.entries.borrow_mut().get_mut(key) {
            binding.generation = generation;
            binding.item = None;
            binding.position = None;
        }
    }
}

struct Slot<U> {
    unit: U,
    view_type: ViewType,
    template: TemplateId,
    state: SlotState,
    generation: u32,
}

/// Every slot the adapter owns, live or pooled.
pub(crate) struct SlotPool<T, U> {
    slots: SlotMap<SlotKey, Slot<U>>,
    free: HashMap<TemplateId, Vec<SlotKey>>,
    bindings: Rc<Bindings<T>>,
    max_pooled: usize,
}

impl<T, U> SlotPool<T, U>
where
    T: Clone + 'static,
    U: RenderUnit<T>,
{
    pub(crate) fn new(bindings: Rc<Bindings<T>>, max_pooled: usize) -> Self {
        Self {
            slots: SlotMap::with_key(),
            free: HashMap::new(),
            bindings,
            max_pooled,
        }
    }

    /// Adds a freshly instantiated unit in the `Created` state.
    pub(crate) fn insert(&mut self, unit: U, view_type: ViewType, template: TemplateId) -> SlotKey {
        let key = self.slots.insert(Slot {
            unit,
            view_type,
            template,
            state: SlotState::Created,
            generation: 0,
        });
        self.bindings.insert(key);
        tracing::trace!(target: targets::SLOT, ?key, ?view_type, ?template, "slot created");
        key
    }

    /// Takes a pooled slot for `template`, if one is available.
    pub(crate) fn acquire(&mut self, template: TemplateId, view_type: ViewType) -> Option<SlotKey> {
        let key = self.free.get_mut(&template)?.pop()?;
        if let Some(slot) = self.slots.get_mut(key) {
            slot.view_type = view_type;
        }
        tracing::trace!(target: targets::SLOT, ?key, ?template, "slot reused from pool");
        Some(key)
    }

    pub(crate) fn handle(&self, key: SlotKey) -> Option<SlotHandle> {
        self.slots
            .get(key)
            .map(|slot| SlotHandle::new(key, slot.generation))
    }

    /// Resolves a handle to its key if it is still current.
    pub(crate) fn check(&self, handle: SlotHandle) -> AdapterResult<SlotKey> {
        match self.slots.get(handle.key) {
            Some(slot) if slot.generation == handle.generation => Ok(handle.key),
            _ => Err(AdapterError::StaleSlot { slot: handle }),
        }
    }

    pub(crate) fn state(&self, key: SlotKey) -> Option<SlotState> {
        self.slots.get(key).map(|slot| slot.state)
    }

    pub(crate) fn view_type(&self, key: SlotKey) -> Option<ViewType> {
        self.slots.get(key).map(|slot| slot.view_type)
    }

    pub(crate) fn unit(&self, key: SlotKey) -> Option<&U> {
        self.slots.get(key).map(|slot| &slot.unit)
    }

    pub(crate) fn set_position(&self, key: SlotKey, position: usize) {
        self.bindings.set_position(key, Some(position));
    }

    /// Number of slots, pooled ones included.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn pooled(&self, template: TemplateId) -> usize {
        self.free.get(&template).map_or(0, Vec::len)
    }

    fn slot_mut(&mut self, key: SlotKey) -> AdapterResult<&mut Slot<U>> {
        self.slots
            .get_mut(key)
            .ok_or(AdapterError::UnknownSlot { key })
    }

    /// Binds `item` to the slot, clearing any previous item and subscription.
    ///
    /// Leaves the slot `Bound`. Binding a recycled slot takes it out of the pool.
    pub(crate) fn bind(
        &mut self,
        key: SlotKey,
        item: T,
        position: usize,
        events: &ItemEvents<T, U::Event>,
    ) -> AdapterResult<()> {
        let bindings = Rc::clone(&self.bindings);
        let slot = self.slot_mut(key)?;
        let previous = slot.state;
        if previous == SlotState::Attached {
            events.unsubscribe(key);
        }
        if matches!(previous, SlotState::Bound | SlotState::Attached) {
            slot.unit.unsubscribe_item();
        }
        let template = slot.template;
        bindings.set(key, None, Some(position));

        slot.unit.bind(&item, position);
        slot.unit.subscribe_item(&item);
        slot.state = SlotState::Bound;
        bindings.set_item(key, Some(item));

        if previous == SlotState::Created {
            if let Some(free) = self.free.get_mut(&template) {
                free.retain(|pooled| *pooled != key);
            }
        }
        tracing::trace!(target: targets::SLOT, ?key, position, ?previous, "slot bound");
        Ok(())
    }

    /// Opens the slot's event subscription.
    ///
    /// A `Detached` slot has lost its item; `resolve` looks it up again by the
    /// slot's position without calling the unit's `bind`.
    pub(crate) fn attach(
        &mut self,
        key: SlotKey,
        events: &Rc<ItemEvents<T, U::Event>>,
        resolve: impl FnOnce(usize) -> Option<T>,
    ) -> AdapterResult<()> {
        let bindings = Rc::clone(&self.bindings);
        let slot = self.slot_mut(key)?;
        match slot.state {
            SlotState::Bound => {}
            SlotState::Detached => {
                let handle = SlotHandle::new(key, slot.generation);
                if !bindings.has_item(key) {
                    let position = bindings
                        .raw_position(key)
                        .ok_or(AdapterError::StaleSlot { slot: handle })?;
                    let item = resolve(position).ok_or(AdapterError::StaleSlot { slot: handle })?;
                    bindings.set_item(key, Some(item));
                }
                let item = bindings
                    .raw_item(key)
                    .ok_or(AdapterError::StaleSlot { slot: handle })?;
                slot.unit.subscribe_item(&item);
            }
            state => {
                return Err(AdapterError::InvalidTransition {
                    action: "attach",
                    state,
                });
            }
        }

        let handle = SlotHandle::new(key, slot.generation);
        if let Some(source) = slot.unit.event_source() {
            events.subscribe(handle, source);
        }
        slot.state = SlotState::Attached;
        tracing::trace!(target: targets::SLOT, ?key, "slot attached");
        Ok(())
    }

    /// Closes the subscription and clears the item. The slot keeps its position.
    pub(crate) fn detach(&mut self, key: SlotKey, events: &ItemEvents<T, U::Event>) -> AdapterResult<()> {
        let bindings = Rc::clone(&self.bindings);
        let slot = self.slot_mut(key)?;
        match slot.state {
            SlotState::Attached => {
                events.unsubscribe(key);
            }
            SlotState::Bound => {}
            state => {
                return Err(AdapterError::InvalidTransition {
                    action: "detach",
                    state,
                });
            }
        }
        slot.unit.unsubscribe_item();
        bindings.set_item(key, None);
        slot.state = SlotState::Detached;
        tracing::trace!(target: targets::SLOT, ?key, "slot detached");
        Ok(())
    }

    /// Returns the slot to the pool of its template, or drops it if the pool is full.
    pub(crate) fn recycle(&mut self, key: SlotKey, events: &ItemEvents<T, U::Event>) -> AdapterResult<()> {
        let state = self.state(key).ok_or(AdapterError::UnknownSlot { key })?;
        match state {
            SlotState::Attached | SlotState::Bound => self.detach(key, events)?,
            SlotState::Created if self.is_pooled(key) => return Ok(()),
            SlotState::Created | SlotState::Detached => {}
        }

        let max_pooled = self.max_pooled;
        let bindings = Rc::clone(&self.bindings);
        let slot = self.slot_mut(key)?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Created;
        slot.unit.recycled();
        bindings.advance(key, slot.generation);
        let template = slot.template;

        let free = self.free.entry(template).or_default();
        if free.len() < max_pooled {
            free.push(key);
            tracing::trace!(target: targets::SLOT, ?key, ?template, "slot recycled");
        } else {
            self.slots.remove(key);
            self.bindings.remove(key);
            tracing::trace!(target: targets::SLOT, ?key, ?template, "pool full, slot dropped");
        }
        Ok(())
    }

    fn is_pooled(&self, key: SlotKey) -> bool {
        self.slots
            .get(key)
            .and_then(|slot| self.free.get(&slot.template))
            .is_some_and(|free| free.contains(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use horizon_reconcile_core::Signal;

    use crate::model::surface::EventResult;

    #[derive(Default)]
    struct Probe {
        log: Rc<RefCell<Vec<String>>>,
        clicks: Signal<EventResult<u8>>,
    }

    impl RenderUnit<char> for Probe {
        type Event = u8;

        fn bind(&mut self, item: &char, position: usize) {
            self.log.borrow_mut().push(format!("bind {item}@{position}"));
        }

        fn event_source(&self) -> Option<&Signal<EventResult<u8>>> {
            Some(&self.clicks)
        }

        fn subscribe_item(&mut self, item: &char) {
            self.log.borrow_mut().push(format!("subscribe {item}"));
        }

        fn unsubscribe_item(&mut self) {
            self.log.borrow_mut().push("unsubscribe".to_string());
        }
    }

    fn setup(max_pooled: usize) -> (SlotPool<char, Probe>, Rc<ItemEvents<char, u8>>) {
        let bindings = Rc::new(Bindings::new());
        let events = ItemEvents::new(Rc::clone(&bindings));
        (SlotPool::new(bindings, max_pooled), events)
    }

    #[test]
    fn test_lifecycle_transitions() {
        let (mut pool, events) = setup(4);
        let log = Rc::new(RefCell::new(Vec::new()));
        let key = pool.insert(
            Probe {
                log: log.clone(),
                ..Default::default()
            },
            ViewType::DEFAULT,
            TemplateId(1),
        );
        assert_eq!(pool.state(key), Some(SlotState::Created));

        assert!(matches!(
            pool.attach(key, &events, |_| None),
            Err(AdapterError::InvalidTransition { action: "attach", .. })
        ));

        pool.bind(key, 'a', 0, &events).unwrap();
        pool.attach(key, &events, |_| None).unwrap();
        assert_eq!(pool.state(key), Some(SlotState::Attached));
        assert!(events.is_subscribed(key));

        pool.detach(key, &events).unwrap();
        assert_eq!(pool.state(key), Some(SlotState::Detached));
        assert_eq!(events.bindings().item(pool.handle(key).unwrap()), None);
        assert!(!events.is_subscribed(key));

        assert_eq!(
            *log.borrow(),
            vec!["bind a@0", "subscribe a", "unsubscribe"]
        );
    }

    #[test]
    fn test_reattach_resolves_item_without_rebind() {
        let (mut pool, events) = setup(4);
        let log = Rc::new(RefCell::new(Vec::new()));
        let key = pool.insert(
            Probe {
                log: log.clone(),
                ..Default::default()
            },
            ViewType::DEFAULT,
            TemplateId(1),
        );
        pool.bind(key, 'a', 3, &events).unwrap();
        pool.attach(key, &events, |_| None).unwrap();
        pool.detach(key, &events).unwrap();
        log.borrow_mut().clear();

        pool.attach(key, &events, |position| (position == 3).then_some('z'))
            .unwrap();
        assert_eq!(events.bindings().item(pool.handle(key).unwrap()), Some('z'));
        assert_eq!(*log.borrow(), vec!["subscribe z"]);
    }

    #[test]
    fn test_recycle_invalidates_handle() {
        let (mut pool, events) = setup(4);
        let key = pool.insert(Probe::default(), ViewType::DEFAULT, TemplateId(1));
        pool.bind(key, 'a', 0, &events).unwrap();
        pool.attach(key, &events, |_| None).unwrap();
        let handle = pool.handle(key).unwrap();
        assert_eq!(events.bindings().item(handle), Some('a'));

        pool.recycle(key, &events).unwrap();
        assert_eq!(pool.state(key), Some(SlotState::Created));
        assert_eq!(events.bindings().item(handle), None);
        assert!(matches!(pool.check(handle), Err(AdapterError::StaleSlot { .. })));
        assert_eq!(pool.pooled(TemplateId(1)), 1);

        // Recycling twice is harmless
        pool.recycle(key, &events).unwrap();
        assert_eq!(pool.pooled(TemplateId(1)), 1);

        let reused = pool.acquire(TemplateId(1), ViewType::DEFAULT).unwrap();
        assert_eq!(reused, key);
        pool.bind(reused, 'b', 1, &events).unwrap();
        assert_eq!(pool.pooled(TemplateId(1)), 0);
        assert_eq!(events.bindings().item(pool.handle(key).unwrap()), Some('b'));
    }

    #[test]
    fn test_full_pool_drops_slot() {
        let (mut pool, events) = setup(1);
        let first = pool.insert(Probe::default(), ViewType::DEFAULT, TemplateId(1));
        let second = pool.insert(Probe::default(), ViewType::DEFAULT, TemplateId(1));
        pool.recycle(first, &events).unwrap();
        pool.recycle(second, &events).unwrap();
        assert_eq!(pool.pooled(TemplateId(1)), 1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.state(second), None);
    }

    #[test]
    fn test_rebind_attached_closes_subscription() {
        let (mut pool, events) = setup(4);
        let key = pool.insert(Probe::default(), ViewType::DEFAULT, TemplateId(1));
        pool.bind(key, 'a', 0, &events).unwrap();
        pool.attach(key, &events, |_| None).unwrap();
        assert_eq!(events.subscription_count(), 1);

        pool.bind(key, 'b', 0, &events).unwrap();
        assert_eq!(pool.state(key), Some(SlotState::Bound));
        assert_eq!(events.subscription_count(), 0);

        pool.attach(key, &events, |_| None).unwrap();
        assert_eq!(events.subscription_count(), 1);
    }
}
