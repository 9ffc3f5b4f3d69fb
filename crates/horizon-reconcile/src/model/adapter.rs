//! The reconciling adapter.
//!
//! [`ReconcilingAdapter`] mirrors an [`AdapterSource`] onto a pool of slots.
//! Once attached to a surface it listens to the source's edit scripts and
//! applies each one to its position table:
//!
//! - `remove` recycles the slots at the removed positions
//! - `insert` opens empty positions
//! - `move` carries the slot, and its binding, to the new position
//! - `change` rebinds the slot at that position with the new item
//!
//! A layout pass then fills every visible empty position with a slot (reused
//! from the pool of its template or freshly instantiated), attaches slots that
//! were only bound or detached, and recycles slots outside the visible range.
//!
//! Attaching to a surface always starts with a full resynchronization, so
//! scripts produced while the adapter was detached never need to be replayed.
//! A script that does not fit the adapter's position table also triggers a
//! full resynchronization (configurable).
//!
//! Template failures are fatal for the view type that needed the template:
//! the failure is logged, published on
//! [`AdapterSignals::construction_failed`] and returned from every later
//! layout that needs that view type. The surface is never asked again.
//!
//! # Reentrancy
//!
//! Handlers of the adapter's and the source's signals may call back into both,
//! including `set_data`. Scripts published while one is being applied are
//! queued and applied afterwards, in order. Scripts are applied only in the
//! order of their source revisions: a script that arrives ahead of its
//! predecessor triggers a full resynchronization, and scripts the position
//! table already reflects are skipped. Render units must not call back into
//! the adapter from their `bind` and subscription hooks.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use horizon_reconcile::model::{
//!     InstantiateError, ReconcilingAdapter, RenderUnit, SimpleAdapterSource, TemplateId,
//! };
//!
//! struct Label(String);
//!
//! impl RenderUnit<String> for Label {
//!     type Event = ();
//!
//!     fn bind(&mut self, item: &String, _position: usize) {
//!         self.0 = item.clone();
//!     }
//! }
//!
//! let source = Rc::new(SimpleAdapterSource::simple(vec!["a".to_string()], TemplateId(0)));
//! let surface = |_template: TemplateId| Ok::<_, InstantiateError>(Label(String::new()));
//! let adapter = ReconcilingAdapter::new(Rc::clone(&source), surface);
//!
//! adapter.attach_to_surface().unwrap();
//! source.set_data(vec!["a".to_string(), "b".to_string()]);
//! assert_eq!(adapter.item_count(), 2);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::ops::Range;
use std::rc::Rc;

use horizon_reconcile_core::logging::{span_names, targets};
use horizon_reconcile_core::{ConnectionGuard, PerfSpan, ReconcileError, Signal};

use super::error::{AdapterError, AdapterResult};
use super::events::ItemEvents;
use super::item::DiffItem;
use super::script::{EditOp, EditScript};
use super::slot::{Bindings, SlotHandle, SlotKey, SlotPool, SlotState};
use super::source::{AdapterSource, Layouts, TemplateId, ViewType};
use super::surface::{EventOf, RenderSurface};

/// Configuration for a [`ReconcilingAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Emit [`AdapterSignals::scroll_to_top_requested`] when a script inserts
    /// at position 0. Any delay before scrolling is up to the host.
    pub request_scroll_on_front_insert: bool,
    /// Fall back to a full resynchronization when a script does not fit the
    /// adapter's position table. When off, the script is rejected with
    /// [`AdapterError::ScriptMismatch`].
    pub resync_on_script_mismatch: bool,
    /// Recycled slots kept per template. Slots recycled into a full pool are dropped.
    pub max_pooled_per_template: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            request_scroll_on_front_insert: true,
            resync_on_script_mismatch: true,
            max_pooled_per_template: 5,
        }
    }
}

impl AdapterConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether front inserts request a scroll to the top.
    pub fn request_scroll_on_front_insert(mut self, request: bool) -> Self {
        self.request_scroll_on_front_insert = request;
        self
    }

    /// Sets whether mismatched scripts fall back to a full resynchronization.
    pub fn resync_on_script_mismatch(mut self, resync: bool) -> Self {
        self.resync_on_script_mismatch = resync;
        self
    }

    /// Sets the pool capacity per template.
    pub fn max_pooled_per_template(mut self, max: usize) -> Self {
        self.max_pooled_per_template = max;
        self
    }
}

/// Notifications published by the adapter.
pub struct AdapterSignals {
    /// Emitted after a script was applied and the layout pass finished.
    /// A full resynchronization is reported as a reset script.
    pub script_applied: Signal<Rc<EditScript>>,
    /// Emitted after a script that inserted at position 0.
    pub scroll_to_top_requested: Signal<()>,
    /// Emitted once per view type whose slot could not be constructed.
    pub construction_failed: Signal<AdapterError>,
}

impl AdapterSignals {
    fn new() -> Self {
        Self {
            script_applied: Signal::new(),
            scroll_to_top_requested: Signal::new(),
            construction_failed: Signal::new(),
        }
    }
}

struct AdapterState<T, U> {
    pool: SlotPool<T, U>,
    positions: Vec<Option<SlotKey>>,
    items: Rc<[T]>,
    /// Source revision the position table reflects.
    revision: u64,
    visible: Option<Range<usize>>,
    failed: HashMap<ViewType, AdapterError>,
    last_error: Option<AdapterError>,
}

struct Pending<T> {
    script: Rc<EditScript>,
    data: Rc<[T]>,
    data_revision: u64,
}

/// Clears the draining flag even if applying a script unwinds.
struct DrainGuard<'a>(&'a Cell<bool>);

impl<'a> DrainGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[derive(Default)]
struct Outcome {
    applied: Option<Rc<EditScript>>,
    scroll_to_top: bool,
    new_failures: Vec<AdapterError>,
    errors: Vec<AdapterError>,
}

struct Inner<T, L, S: RenderSurface<T>> {
    source: Rc<AdapterSource<T, L>>,
    surface: RefCell<S>,
    config: AdapterConfig,
    state: RefCell<AdapterState<T, S::Unit>>,
    events: Rc<ItemEvents<T, EventOf<T, S>>>,
    signals: AdapterSignals,
    pending: RefCell<VecDeque<Pending<T>>>,
    draining: Cell<bool>,
    connection: RefCell<Option<ConnectionGuard>>,
}

/// Applies a source's edit scripts to a pool of render slots.
///
/// This is a cheap handle; clones share the same adapter.
pub struct ReconcilingAdapter<T, L, S: RenderSurface<T>> {
    inner: Rc<Inner<T, L, S>>,
}

impl<T, L, S> ReconcilingAdapter<T, L, S>
where
    T: DiffItem + Clone + 'static,
    L: Layouts<T> + 'static,
    S: RenderSurface<T> + 'static,
    S::Unit: 'static,
{
    /// Creates a detached adapter with the default configuration.
    pub fn new(source: Rc<AdapterSource<T, L>>, surface: S) -> Self {
        Self::with_config(source, surface, AdapterConfig::default())
    }

    /// Creates a detached adapter.
    pub fn with_config(source: Rc<AdapterSource<T, L>>, surface: S, config: AdapterConfig) -> Self {
        let bindings = Rc::new(Bindings::new());
        let events = ItemEvents::new(Rc::clone(&bindings));
        let state = AdapterState {
            pool: SlotPool::new(bindings, config.max_pooled_per_template),
            positions: Vec::new(),
            items: Rc::from(Vec::new()),
            revision: 0,
            visible: None,
            failed: HashMap::new(),
            last_error: None,
        };
        Self {
            inner: Rc::new(Inner {
                source,
                surface: RefCell::new(surface),
                config,
                state: RefCell::new(state),
                events,
                signals: AdapterSignals::new(),
                pending: RefCell::new(VecDeque::new()),
                draining: Cell::new(false),
                connection: RefCell::new(None),
            }),
        }
    }

    /// Connects to the source and resynchronizes every position.
    ///
    /// Does nothing if already attached. Returns the first error of the
    /// initial layout pass.
    pub fn attach_to_surface(&self) -> AdapterResult<()> {
        if self.is_attached() {
            return Ok(());
        }
        let weak = Rc::downgrade(&self.inner);
        let guard = self
            .inner
            .source
            .signals()
            .edit_script
            .connect_scoped(move |script: &Rc<EditScript>| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_script(Rc::clone(script));
                }
            });
        *self.inner.connection.borrow_mut() = Some(guard);
        self.inner.pending.borrow_mut().clear();
        tracing::debug!(target: targets::ADAPTER, "attached to surface");

        let outcome = self.inner.resync();
        self.inner.publish(outcome)
    }

    /// Disconnects from the source and recycles every slot.
    pub fn detach_from_surface(&self) {
        let Some(guard) = self.inner.connection.borrow_mut().take() else {
            return;
        };
        drop(guard);
        self.inner.pending.borrow_mut().clear();

        let mut guard = self.inner.state.borrow_mut();
        let state = &mut *guard;
        for key in std::mem::take(&mut state.positions).into_iter().flatten() {
            if let Err(error) = state.pool.recycle(key, &self.inner.events) {
                tracing::warn!(target: targets::ADAPTER, %error, "failed to recycle slot on detach");
            }
        }
        state.items = Rc::from(Vec::new());
        tracing::debug!(target: targets::ADAPTER, "detached from surface");
    }

    /// Returns `true` while connected to the source.
    pub fn is_attached(&self) -> bool {
        self.inner.connection.borrow().is_some()
    }

    /// Restricts slots to `range`; `None` makes every position visible.
    ///
    /// Runs a layout pass if attached.
    pub fn set_visible_range(&self, range: Option<Range<usize>>) -> AdapterResult<()> {
        self.inner.state.borrow_mut().visible = range;
        self.layout()
    }

    /// The visible range, if restricted.
    pub fn visible_range(&self) -> Option<Range<usize>> {
        self.inner.state.borrow().visible.clone()
    }

    /// Runs a layout pass. Does nothing while detached.
    pub fn layout(&self) -> AdapterResult<()> {
        if !self.is_attached() {
            return Ok(());
        }
        let outcome = {
            let mut state = self.inner.state.borrow_mut();
            let (errors, new_failures) = self.inner.layout_locked(&mut state);
            Outcome {
                new_failures,
                errors,
                ..Outcome::default()
            }
        };
        self.inner.publish(outcome)
    }

    /// Number of positions the adapter currently tracks.
    pub fn item_count(&self) -> usize {
        self.inner.state.borrow().positions.len()
    }

    /// The slot at `position`, if one is assigned.
    pub fn slot_at(&self, position: usize) -> Option<SlotHandle> {
        let state = self.inner.state.borrow();
        let key = state.positions.get(position).copied().flatten()?;
        state.pool.handle(key)
    }

    /// The state of a slot, or `None` if the handle is stale.
    pub fn slot_state(&self, handle: SlotHandle) -> Option<SlotState> {
        let state = self.inner.state.borrow();
        let key = state.pool.check(handle).ok()?;
        state.pool.state(key)
    }

    /// The item a slot shows, or `None` if the handle is stale or the slot is unbound.
    pub fn slot_item(&self, handle: SlotHandle) -> Option<T> {
        self.inner.events.bindings().item(handle)
    }

    /// The position of a slot, or `None` if the handle is stale or the slot is pooled.
    pub fn slot_position(&self, handle: SlotHandle) -> Option<usize> {
        self.inner.events.bindings().position(handle)
    }

    /// Runs `f` with the render unit of a slot.
    pub fn with_unit<R>(&self, handle: SlotHandle, f: impl FnOnce(&S::Unit) -> R) -> Option<R> {
        let state = self.inner.state.borrow();
        let key = state.pool.check(handle).ok()?;
        state.pool.unit(key).map(f)
    }

    /// Detaches a slot: closes its subscription and clears its item.
    pub fn detach_slot(&self, handle: SlotHandle) -> AdapterResult<()> {
        let mut state = self.inner.state.borrow_mut();
        let key = state.pool.check(handle)?;
        state.pool.detach(key, &self.inner.events)
    }

    /// Attaches a bound or detached slot, re-resolving its item if it was cleared.
    pub fn attach_slot(&self, handle: SlotHandle) -> AdapterResult<()> {
        let mut guard = self.inner.state.borrow_mut();
        let state = &mut *guard;
        let key = state.pool.check(handle)?;
        let items = Rc::clone(&state.items);
        state
            .pool
            .attach(key, &self.inner.events, |position| items.get(position).cloned())
    }

    /// Recycles a slot and frees its position; the next layout pass refills it.
    pub fn recycle_slot(&self, handle: SlotHandle) -> AdapterResult<()> {
        let mut guard = self.inner.state.borrow_mut();
        let state = &mut *guard;
        let key = state.pool.check(handle)?;
        for position in state.positions.iter_mut() {
            if *position == Some(key) {
                *position = None;
            }
        }
        state.pool.recycle(key, &self.inner.events)
    }

    /// Number of slots in the pool of `template`.
    pub fn pooled_count(&self, template: TemplateId) -> usize {
        self.inner.state.borrow().pool.pooled(template)
    }

    /// Number of slots owned by the adapter, pooled ones included.
    pub fn slot_count(&self) -> usize {
        self.inner.state.borrow().pool.len()
    }

    /// Returns `true` if slot construction for `view_type` failed.
    pub fn is_view_type_failed(&self, view_type: ViewType) -> bool {
        self.inner.state.borrow().failed.contains_key(&view_type)
    }

    /// Takes the first error raised while applying scripts from the source
    /// since the previous call. Later errors are logged.
    pub fn take_error(&self) -> Option<AdapterError> {
        self.inner.state.borrow_mut().last_error.take()
    }

    /// The per-adapter event stream.
    pub fn events(&self) -> &ItemEvents<T, EventOf<T, S>> {
        &self.inner.events
    }

    /// The adapter's notifications.
    pub fn signals(&self) -> &AdapterSignals {
        &self.inner.signals
    }

    /// The source this adapter mirrors.
    pub fn source(&self) -> &Rc<AdapterSource<T, L>> {
        &self.inner.source
    }

    /// The adapter configuration.
    pub fn config(&self) -> AdapterConfig {
        self.inner.config
    }
}

impl<T, L, S> Inner<T, L, S>
where
    T: DiffItem + Clone + 'static,
    L: Layouts<T> + 'static,
    S: RenderSurface<T> + 'static,
    S::Unit: 'static,
{
    fn on_script(&self, script: Rc<EditScript>) {
        self.pending.borrow_mut().push_back(Pending {
            script,
            data: self.source.data(),
            data_revision: self.source.revision(),
        });
        if self.draining.get() {
            tracing::trace!(target: targets::ADAPTER, "script queued behind the one being applied");
            return;
        }

        let _draining = DrainGuard::enter(&self.draining);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(pending) = next else {
                break;
            };
            let outcome = self.apply(pending.script, pending.data, pending.data_revision);
            if let Err(error) = self.publish(outcome) {
                let mut state = self.state.borrow_mut();
                if state.last_error.is_some() {
                    tracing::warn!(target: targets::ADAPTER, %error, "script error not kept, an earlier one is pending");
                } else {
                    state.last_error = Some(error);
                }
            }
        }
    }

    fn publish(&self, outcome: Outcome) -> AdapterResult<()> {
        for failure in outcome.new_failures {
            self.signals.construction_failed.emit(failure);
        }
        if let Some(script) = outcome.applied {
            self.signals.script_applied.emit(script);
        }
        if outcome.scroll_to_top {
            self.signals.scroll_to_top_requested.emit(());
        }
        match outcome.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn apply(&self, script: Rc<EditScript>, data: Rc<[T]>, data_revision: u64) -> Outcome {
        let _span = PerfSpan::new(span_names::APPLY);
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        if let Some(revision) = script.revision() {
            if revision <= state.revision {
                tracing::trace!(
                    target: targets::ADAPTER,
                    revision,
                    current = state.revision,
                    "script already reflected, skipped"
                );
                return Outcome::default();
            }
            if revision != state.revision + 1 || data_revision != revision {
                tracing::debug!(
                    target: targets::ADAPTER,
                    revision,
                    current = state.revision,
                    data_revision,
                    "script out of sequence, resynchronizing"
                );
                drop(guard);
                return self.resync();
            }
        }

        let len = state.positions.len();
        if script.old_len() != len || script.new_len() != data.len() || !script_fits(&script, len) {
            tracing::warn!(
                target: targets::ADAPTER,
                expected = len,
                actual = script.old_len(),
                "edit script does not match adapter state"
            );
            if self.config.resync_on_script_mismatch {
                drop(guard);
                return self.resync();
            }
            return Outcome {
                errors: vec![AdapterError::ScriptMismatch {
                    expected: len,
                    actual: script.old_len(),
                }],
                ..Outcome::default()
            };
        }

        let mut errors = Vec::new();
        let mut changed = vec![false; len];
        for op in script.ops() {
            match *op {
                EditOp::Remove { position, count } => {
                    changed.drain(position..position + count);
                    let removed: Vec<SlotKey> = state
                        .positions
                        .drain(position..position + count)
                        .flatten()
                        .collect();
                    for key in removed {
                        if let Err(error) = state.pool.recycle(key, &self.events) {
                            errors.push(error);
                        }
                    }
                }
                EditOp::Insert { position, count } => {
                    state
                        .positions
                        .splice(position..position, std::iter::repeat_n(None, count));
                    changed.splice(position..position, std::iter::repeat_n(false, count));
                }
                EditOp::Move { from, to } => {
                    let key = state.positions.remove(from);
                    state.positions.insert(to, key);
                    let flag = changed.remove(from);
                    changed.insert(to, flag);
                }
                EditOp::Change { position, count } => {
                    for flag in &mut changed[position..position + count] {
                        *flag = true;
                    }
                }
            }
        }

        state.items = data;
        for (position, key) in state.positions.iter().enumerate() {
            if let Some(key) = key {
                state.pool.set_position(*key, position);
            }
        }
        for (position, dirty) in changed.into_iter().enumerate() {
            if !dirty {
                continue;
            }
            if let Err(error) = self.rebind(state, position) {
                errors.push(error);
            }
        }

        let (layout_errors, new_failures) = self.layout_locked(state);
        errors.extend(layout_errors);
        if let Some(revision) = script.revision() {
            state.revision = revision;
        }

        let stats = script.stats();
        tracing::debug!(
            target: targets::ADAPTER,
            inserted = stats.inserted,
            removed = stats.removed,
            moved = stats.moved,
            changed = stats.changed,
            "edit script applied"
        );

        let scroll_to_top = self.config.request_scroll_on_front_insert
            && script
                .ops()
                .iter()
                .any(|op| matches!(op, EditOp::Insert { position: 0, .. }));
        Outcome {
            applied: Some(script),
            scroll_to_top,
            new_failures,
            errors,
        }
    }

    /// Rebinds the slot at a changed position, or frees the position if the
    /// item's view type no longer matches the slot.
    fn rebind(&self, state: &mut AdapterState<T, S::Unit>, position: usize) -> AdapterResult<()> {
        let Some(key) = state.positions[position] else {
            return Ok(());
        };
        let item = state.items[position].clone();
        let view_type = self.source.layouts().view_type(&item);
        if state.pool.view_type(key) != Some(view_type) {
            state.positions[position] = None;
            return state.pool.recycle(key, &self.events);
        }

        let was_attached = state.pool.state(key) == Some(SlotState::Attached);
        state.pool.bind(key, item, position, &self.events)?;
        if was_attached {
            state.pool.attach(key, &self.events, |_| None)?;
        }
        Ok(())
    }

    fn resync(&self) -> Outcome {
        let data = self.source.data();
        let revision = self.source.revision();
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let old_len = state.positions.len();
        let mut errors = Vec::new();
        for key in std::mem::take(&mut state.positions).into_iter().flatten() {
            if let Err(error) = state.pool.recycle(key, &self.events) {
                errors.push(error);
            }
        }
        state.positions = vec![None; data.len()];
        state.items = Rc::clone(&data);

        let (layout_errors, new_failures) = self.layout_locked(state);
        errors.extend(layout_errors);
        state.revision = revision;
        tracing::debug!(
            target: targets::ADAPTER,
            old_len,
            new_len = data.len(),
            revision,
            "full resynchronization"
        );

        Outcome {
            applied: Some(Rc::new(EditScript::reset(old_len, data.len()))),
            scroll_to_top: false,
            new_failures,
            errors,
        }
    }

    /// Returns every error of the pass, and separately the view types that
    /// failed for the first time.
    fn layout_locked(
        &self,
        state: &mut AdapterState<T, S::Unit>,
    ) -> (Vec<AdapterError>, Vec<AdapterError>) {
        let _span = PerfSpan::new(span_names::LAYOUT);
        let mut errors = Vec::new();
        let mut new_failures = Vec::new();

        let len = state.positions.len();
        let visible = match &state.visible {
            Some(range) => range.start.min(len)..range.end.min(len),
            None => 0..len,
        };

        for position in (0..len).filter(|position| !visible.contains(position)) {
            if let Some(key) = state.positions[position].take() {
                if let Err(error) = state.pool.recycle(key, &self.events) {
                    errors.push(error);
                }
            }
        }

        for position in visible {
            let assigned = state.positions[position];
            match assigned {
                None => match self.build_slot(state, position, &mut new_failures) {
                    Ok(key) => state.positions[position] = Some(key),
                    Err(error) => errors.push(error),
                },
                Some(key) => {
                    if matches!(
                        state.pool.state(key),
                        Some(SlotState::Bound | SlotState::Detached)
                    ) {
                        let items = Rc::clone(&state.items);
                        if let Err(error) =
                            state.pool.attach(key, &self.events, |at| items.get(at).cloned())
                        {
                            errors.push(error);
                        }
                    }
                }
            }
        }
        (errors, new_failures)
    }

    fn build_slot(
        &self,
        state: &mut AdapterState<T, S::Unit>,
        position: usize,
        new_failures: &mut Vec<AdapterError>,
    ) -> AdapterResult<SlotKey> {
        let item = state
            .items
            .get(position)
            .cloned()
            .ok_or(ReconcileError::PositionOutOfRange {
                position,
                len: state.items.len(),
            })?;
        let view_type = self.source.layouts().view_type(&item);
        if let Some(error) = state.failed.get(&view_type) {
            return Err(error.clone());
        }

        let key = match self.obtain_slot(state, view_type) {
            Ok(key) => key,
            Err(error) => {
                tracing::error!(
                    target: targets::ADAPTER,
                    ?view_type,
                    %error,
                    "slot construction failed, view type disabled"
                );
                state.failed.insert(view_type, error.clone());
                new_failures.push(error.clone());
                return Err(error);
            }
        };

        state.pool.bind(key, item, position, &self.events)?;
        state.pool.attach(key, &self.events, |_| None)?;
        Ok(key)
    }

    fn obtain_slot(
        &self,
        state: &mut AdapterState<T, S::Unit>,
        view_type: ViewType,
    ) -> AdapterResult<SlotKey> {
        let template = self
            .source
            .template(view_type)
            .ok_or(AdapterError::TemplateUnavailable { view_type })?;
        if let Some(key) = state.pool.acquire(template, view_type) {
            return Ok(key);
        }
        let unit = self
            .surface
            .borrow_mut()
            .instantiate(template)
            .map_err(|source| AdapterError::Instantiate {
                view_type,
                template,
                source,
            })?;
        Ok(state.pool.insert(unit, view_type, template))
    }
}

/// Checks that every operation stays inside the list it applies to and that
/// the script ends at its declared length.
fn script_fits(script: &EditScript, len: usize) -> bool {
    let mut len = len;
    for op in script {
        match *op {
            EditOp::Insert { position, count } => {
                if position > len {
                    return false;
                }
                len += count;
            }
            EditOp::Remove { position, count } => {
                if position + count > len {
                    return false;
                }
                len -= count;
            }
            EditOp::Move { from, to } => {
                if from >= len || to >= len {
                    return false;
                }
            }
            EditOp::Change { position, count } => {
                if position + count > len {
                    return false;
                }
            }
        }
    }
    len == script.new_len()
}

impl<T, L, S: RenderSurface<T>> Clone for ReconcilingAdapter<T, L, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, L, S: RenderSurface<T>> std::fmt::Debug for ReconcilingAdapter<T, L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ReconcilingAdapter")
            .field("items", &state.positions.len())
            .field("attached", &self.inner.connection.borrow().is_some())
            .field("config", &self.inner.config)
            .finish()
    }
}
