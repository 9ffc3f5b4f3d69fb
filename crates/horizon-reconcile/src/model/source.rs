//! Data sources for the reconciling adapter.
//!
//! An [`AdapterSource`] owns the current sequence and the rules that turn an
//! item into a [`ViewType`] and a view type into a [`TemplateId`]. Replacing
//! the sequence with [`AdapterSource::set_data`] diffs it against the previous
//! one and publishes the result on two signals:
//!
//! 1. [`SourceSignals::edit_script`] with the [`EditScript`]
//! 2. [`SourceSignals::data_changed`] with the new sequence
//!
//! Both are emitted on every call, in that order, after the source already
//! holds the new sequence. An empty script still means something: the
//! sequences compared equal.
//!
//! Every replacement bumps the source's [revision](AdapterSource::revision)
//! and stamps the published script with it. When a handler replaces the
//! sequence from inside a notification, later handlers can see the nested
//! script before the outer one; the revisions let them tell.
//!
//! # Example
//!
//! ```
//! use horizon_reconcile::model::{SimpleAdapterSource, TemplateId};
//!
//! let source = SimpleAdapterSource::simple(vec!["a".to_string()], TemplateId(1));
//! source.signals().data_changed.connect(|items| {
//!     println!("now showing {} rows", items.len());
//! });
//! let script = source.set_data(vec!["a".to_string(), "b".to_string()]);
//! assert_eq!(script.len(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use horizon_reconcile_core::logging::targets;
use horizon_reconcile_core::{ReconcileError, Signal};

use super::diff::{diff, ValueHashCache};
use super::item::DiffItem;
use super::script::EditScript;

/// Classification tag that selects a slot factory and a render template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewType(pub i32);

impl ViewType {
    /// The view type used by single-layout sources.
    pub const DEFAULT: ViewType = ViewType(-1);
}

/// Opaque identifier of a render template the rendering surface understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub u32);

/// Classification and template resolution rules for a source.
///
/// Both methods are called at least once per visible position per layout
/// pass, so they must be cheap and deterministic.
pub trait Layouts<T> {
    /// Classifies an item. Must depend only on the item and static configuration.
    fn view_type(&self, item: &T) -> ViewType;

    /// Maps a view type to its template, or `None` if no template exists.
    ///
    /// A `None` here is a configuration error that the adapter reports as
    /// fatal for that view type.
    fn template(&self, view_type: ViewType) -> Option<TemplateId>;
}

/// One view type, one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleLayout {
    template: TemplateId,
}

impl SingleLayout {
    /// Creates a layout that renders every item with `template`.
    pub fn new(template: TemplateId) -> Self {
        Self { template }
    }
}

impl<T> Layouts<T> for SingleLayout {
    fn view_type(&self, _item: &T) -> ViewType {
        ViewType::DEFAULT
    }

    fn template(&self, _view_type: ViewType) -> Option<TemplateId> {
        Some(self.template)
    }
}

/// Items of a closed enum that know their own view type.
pub trait Classify {
    /// The view type of this variant.
    fn view_type(&self) -> ViewType;
}

/// Table-driven layouts for items implementing [`Classify`].
#[derive(Debug, Clone, Default)]
pub struct VariantLayouts {
    templates: HashMap<ViewType, TemplateId>,
}

impl VariantLayouts {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the template for a view type.
    pub fn with(mut self, view_type: ViewType, template: TemplateId) -> Self {
        self.templates.insert(view_type, template);
        self
    }

    /// Number of registered view types.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if no view type is registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<T: Classify> Layouts<T> for VariantLayouts {
    fn view_type(&self, item: &T) -> ViewType {
        item.view_type()
    }

    fn template(&self, view_type: ViewType) -> Option<TemplateId> {
        self.templates.get(&view_type).copied()
    }
}

/// Configuration for an [`AdapterSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceConfig {
    /// Whether the diff reports relocated items as moves.
    ///
    /// Turning this off is cheaper when only inserts and removes can happen.
    pub detect_moves: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { detect_moves: true }
    }
}

impl SourceConfig {
    /// Creates the default configuration (move detection on).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether moves are detected.
    pub fn detect_moves(mut self, detect: bool) -> Self {
        self.detect_moves = detect;
        self
    }
}

/// The two notification channels of a source.
pub struct SourceSignals<T> {
    /// Emitted first on every `set_data`, with the computed script.
    pub edit_script: Signal<Rc<EditScript>>,
    /// Emitted second on every `set_data`, with the new sequence.
    pub data_changed: Signal<Rc<[T]>>,
}

impl<T: 'static> SourceSignals<T> {
    fn new() -> Self {
        Self {
            edit_script: Signal::new(),
            data_changed: Signal::new(),
        }
    }
}

/// The owner of the current sequence.
///
/// Mutation goes through `&self` so that slots connected to this source's
/// signals may read it, or even replace its data, while a notification is
/// being delivered.
pub struct AdapterSource<T, L> {
    data: RefCell<Rc<[T]>>,
    hashes: RefCell<ValueHashCache>,
    revision: Cell<u64>,
    layouts: L,
    config: SourceConfig,
    signals: SourceSignals<T>,
}

/// A source with a single view type and a single template.
pub type SimpleAdapterSource<T> = AdapterSource<T, SingleLayout>;

impl<T, L> AdapterSource<T, L>
where
    T: DiffItem + Clone + 'static,
    L: Layouts<T>,
{
    /// Creates a source with the default configuration.
    pub fn new(data: Vec<T>, layouts: L) -> Self {
        Self::with_config(data, layouts, SourceConfig::default())
    }

    /// Creates a source with an explicit configuration.
    pub fn with_config(data: Vec<T>, layouts: L, config: SourceConfig) -> Self {
        let data: Rc<[T]> = Rc::from(data);
        let hashes = ValueHashCache::build(&data);
        Self {
            data: RefCell::new(data),
            hashes: RefCell::new(hashes),
            revision: Cell::new(0),
            layouts,
            config,
            signals: SourceSignals::new(),
        }
    }

    /// Replaces the sequence and publishes the resulting edit script.
    ///
    /// Returns the script that was published.
    pub fn set_data(&self, data: Vec<T>) -> Rc<EditScript> {
        let new: Rc<[T]> = Rc::from(data);
        let old = Rc::clone(&self.data.borrow());

        let revision = self.revision.get() + 1;
        let script = {
            let hashes = self.hashes.borrow();
            Rc::new(diff(&old, &new, &hashes, self.config.detect_moves).with_revision(revision))
        };

        *self.data.borrow_mut() = Rc::clone(&new);
        *self.hashes.borrow_mut() = ValueHashCache::build(&new);
        self.revision.set(revision);
        tracing::debug!(
            target: targets::SOURCE,
            old_len = old.len(),
            new_len = new.len(),
            ops = script.len(),
            "data replaced"
        );

        self.signals.edit_script.emit(Rc::clone(&script));
        self.signals.data_changed.emit(new);
        script
    }

    /// Number of replacements so far. The initial sequence is revision 0.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    /// A snapshot of the current sequence.
    pub fn data(&self) -> Rc<[T]> {
        Rc::clone(&self.data.borrow())
    }

    /// The item at `position`, or `None` if out of range.
    pub fn get(&self, position: usize) -> Option<T> {
        self.data.borrow().get(position).cloned()
    }

    /// The item at `position`, or a [`ReconcileError::PositionOutOfRange`].
    pub fn require(&self, position: usize) -> horizon_reconcile_core::Result<T> {
        let data = self.data.borrow();
        data.get(position)
            .cloned()
            .ok_or(ReconcileError::PositionOutOfRange {
                position,
                len: data.len(),
            })
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    /// Returns `true` if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    /// The view type of the item at `position`, or `None` if out of range.
    pub fn view_type(&self, position: usize) -> Option<ViewType> {
        self.data
            .borrow()
            .get(position)
            .map(|item| self.layouts.view_type(item))
    }

    /// The template for a view type.
    pub fn template(&self, view_type: ViewType) -> Option<TemplateId> {
        self.layouts.template(view_type)
    }

    /// The content hash cached for `position` at the last replacement.
    pub fn cached_hash(&self, position: usize) -> Option<u64> {
        self.hashes.borrow().get(position)
    }

    /// Number of entries in the hash cache. Always equals [`len`](Self::len).
    pub fn hash_cache_len(&self) -> usize {
        self.hashes.borrow().len()
    }

    /// The classification rules.
    pub fn layouts(&self) -> &L {
        &self.layouts
    }

    /// The source configuration.
    pub fn config(&self) -> SourceConfig {
        self.config
    }

    /// The notification channels.
    pub fn signals(&self) -> &SourceSignals<T> {
        &self.signals
    }
}

impl<T: DiffItem + Clone + 'static> AdapterSource<T, SingleLayout> {
    /// Creates a single-layout source. Move detection is off.
    pub fn simple(data: Vec<T>, template: TemplateId) -> Self {
        Self::with_config(
            data,
            SingleLayout::new(template),
            SourceConfig::new().detect_moves(false),
        )
    }
}

impl<T, L> std::fmt::Debug for AdapterSource<T, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSource")
            .field("len", &self.data.borrow().len())
            .field("config", &self.config)
            .finish()
    }
}

static_assertions::assert_not_impl_any!(AdapterSource<String, SingleLayout>: Send, Sync);
