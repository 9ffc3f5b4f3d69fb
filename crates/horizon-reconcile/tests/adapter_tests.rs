//! Tests for the reconciling adapter driven through a data source.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use horizon_reconcile::model::{
    AdapterConfig, AdapterError, AdapterSource, Classify, DiffItem, EditOp, EventResult,
    EventSourceError, InstantiateError, ReconcilingAdapter, RenderUnit, SimpleAdapterSource,
    SingleLayout, SlotState, SourceConfig, TemplateId, VariantLayouts, ViewType,
};
use horizon_reconcile::Signal;
use tracing_subscriber::EnvFilter;

/// Routes engine logs to the test harness; filter with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    id: char,
    version: u32,
}

impl DiffItem for Entry {
    fn equals_item(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

fn entries(pairs: &[(char, u32)]) -> Vec<Entry> {
    pairs.iter()
        .map(|&(id, version)| Entry { id, version })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Click {
    Tap,
    LongPress,
}

type Log = Rc<RefCell<Vec<String>>>;

struct Row {
    log: Log,
    clicks: Rc<Signal<EventResult<Click>>>,
}

impl RenderUnit<Entry> for Row {
    type Event = Click;

    fn bind(&mut self, item: &Entry, position: usize) {
        self.log
            .borrow_mut()
            .push(format!("bind {}{}@{}", item.id, item.version, position));
    }

    fn event_source(&self) -> Option<&Signal<EventResult<Click>>> {
        Some(&self.clicks)
    }
}

type Surface = Box<dyn FnMut(TemplateId) -> Result<Row, InstantiateError>>;
type Adapter<L> = ReconcilingAdapter<Entry, L, Surface>;

fn surface(log: &Log, created: &Rc<RefCell<usize>>) -> Surface {
    let log = log.clone();
    let created = created.clone();
    Box::new(move |_template| {
        *created.borrow_mut() += 1;
        Ok(Row {
            log: log.clone(),
            clicks: Rc::new(Signal::new()),
        })
    })
}

struct Fixture<L> {
    source: Rc<AdapterSource<Entry, L>>,
    adapter: Adapter<L>,
    log: Log,
    created: Rc<RefCell<usize>>,
}

fn fixture(initial: &[(char, u32)], detect_moves: bool) -> Fixture<SingleLayout> {
    init_tracing();
    let source = Rc::new(AdapterSource::with_config(
        entries(initial),
        SingleLayout::new(TemplateId(0)),
        SourceConfig::new().detect_moves(detect_moves),
    ));
    let log = Rc::new(RefCell::new(Vec::new()));
    let created = Rc::new(RefCell::new(0));
    let adapter = ReconcilingAdapter::new(Rc::clone(&source), surface(&log, &created));
    adapter.attach_to_surface().unwrap();
    log.borrow_mut().clear();
    Fixture {
        source,
        adapter,
        log,
        created,
    }
}

fn shown<L: horizon_reconcile::model::Layouts<Entry> + 'static>(
    adapter: &Adapter<L>,
) -> Vec<Option<(char, u32)>> {
    (0..adapter.item_count())
        .map(|position| {
            adapter
                .slot_at(position)
                .and_then(|slot| adapter.slot_item(slot))
                .map(|entry| (entry.id, entry.version))
        })
        .collect()
}

fn clicks_of<L: horizon_reconcile::model::Layouts<Entry> + 'static>(
    adapter: &Adapter<L>,
    position: usize,
) -> Rc<Signal<EventResult<Click>>> {
    let slot = adapter.slot_at(position).unwrap();
    adapter
        .with_unit(slot, |row| Rc::clone(&row.clicks))
        .unwrap()
}

#[test]
fn test_content_change_rebinds_only_changed_slot() {
    let fx = fixture(&[('A', 1), ('B', 2), ('C', 3)], true);
    let before: Vec<_> = (0..3).map(|p| fx.adapter.slot_at(p).unwrap()).collect();

    let script = fx.source.set_data(entries(&[('A', 1), ('B', 9), ('C', 3)]));

    assert_eq!(script.ops(), &[EditOp::Change { position: 1, count: 1 }]);
    assert_eq!(*fx.log.borrow(), vec!["bind B9@1"]);
    let after: Vec<_> = (0..3).map(|p| fx.adapter.slot_at(p).unwrap()).collect();
    assert_eq!(before, after);
    assert_eq!(
        shown(&fx.adapter),
        vec![Some(('A', 1)), Some(('B', 9)), Some(('C', 3))]
    );
}

#[test]
fn test_rotation_moves_slot_without_rebinding() {
    let fx = fixture(&[('A', 0), ('B', 0), ('C', 0)], true);
    let slot_a = fx.adapter.slot_at(0).unwrap();

    let script = fx.source.set_data(entries(&[('B', 0), ('C', 0), ('A', 0)]));

    assert_eq!(script.ops(), &[EditOp::Move { from: 0, to: 2 }]);
    assert!(fx.log.borrow().is_empty());
    assert_eq!(fx.adapter.slot_at(2), Some(slot_a));
    assert_eq!(fx.adapter.slot_position(slot_a), Some(2));
    assert_eq!(fx.adapter.slot_state(slot_a), Some(SlotState::Attached));
}

#[test]
fn test_rotation_without_moves_recycles_and_rebinds() {
    let fx = fixture(&[('A', 0), ('B', 0), ('C', 0)], false);
    let slot_a = fx.adapter.slot_at(0).unwrap();

    let script = fx.source.set_data(entries(&[('B', 0), ('C', 0), ('A', 0)]));

    assert_eq!(
        script.ops(),
        &[
            EditOp::Remove { position: 0, count: 1 },
            EditOp::Insert { position: 2, count: 1 },
        ]
    );
    assert_eq!(*fx.log.borrow(), vec!["bind A0@2"]);
    assert_eq!(fx.adapter.slot_item(slot_a), None);
    assert_eq!(*fx.created.borrow(), 3);
    assert_eq!(
        shown(&fx.adapter),
        vec![Some(('B', 0)), Some(('C', 0)), Some(('A', 0))]
    );
}

#[test]
fn test_insert_into_empty_publishes_raw_sequence() {
    let source = Rc::new(SimpleAdapterSource::<String>::simple(Vec::new(), TemplateId(0)));
    let raw = Rc::new(RefCell::new(Vec::new()));
    let recv = raw.clone();
    source
        .signals()
        .data_changed
        .connect(move |items| recv.borrow_mut().push(items.to_vec()));

    let script = source.set_data(vec!["X".to_string(), "Y".to_string()]);

    assert_eq!(script.ops(), &[EditOp::Insert { position: 0, count: 2 }]);
    assert_eq!(*raw.borrow(), vec![vec!["X".to_string(), "Y".to_string()]]);
}

#[test]
fn test_slots_are_exclusive() {
    let fx = fixture(&[('A', 0), ('B', 0), ('C', 0), ('D', 0)], true);
    let updates = [
        vec![('D', 0), ('A', 0), ('C', 1)],
        vec![('E', 0), ('D', 0), ('A', 0), ('C', 1), ('F', 0)],
        vec![('F', 0), ('C', 2)],
        vec![('C', 2), ('F', 0), ('G', 0), ('H', 0), ('A', 0)],
    ];

    for update in updates {
        fx.source.set_data(entries(&update));

        let mut seen = HashSet::new();
        for position in 0..fx.adapter.item_count() {
            let slot = fx.adapter.slot_at(position).unwrap();
            assert!(seen.insert(slot), "slot assigned to two positions");
            assert_eq!(fx.adapter.slot_position(slot), Some(position));
            assert_eq!(fx.adapter.slot_state(slot), Some(SlotState::Attached));
        }
        let expected: Vec<_> = update.iter().copied().map(Some).collect();
        assert_eq!(shown(&fx.adapter), expected);
        assert_eq!(fx.adapter.events().subscription_count(), update.len());
    }
}

#[test]
fn test_event_resolves_to_absent_after_recycle() {
    let fx = fixture(&[('A', 0), ('B', 0)], true);
    let captured = Rc::new(RefCell::new(Vec::new()));
    let recv = captured.clone();
    fx.adapter
        .events()
        .events()
        .connect(move |event| recv.borrow_mut().push(event.clone()));

    clicks_of(&fx.adapter, 1).emit(Ok(Click::Tap));
    {
        let events = captured.borrow();
        assert_eq!(events[0].item(), Some(Entry { id: 'B', version: 0 }));
        assert_eq!(events[0].position(), Some(1));
        assert_eq!(*events[0].payload(), Click::Tap);
    }

    fx.source.set_data(entries(&[('A', 0)]));

    let events = captured.borrow();
    assert_eq!(events[0].item(), None);
    assert_eq!(events[0].position(), None);
    assert!(matches!(
        events[0].require_item(),
        Err(AdapterError::StaleSlot { .. })
    ));
}

#[test]
fn test_events_follow_moved_slot() {
    let fx = fixture(&[('A', 0), ('B', 0), ('C', 0)], true);
    let clicks = clicks_of(&fx.adapter, 0);
    let captured = Rc::new(RefCell::new(Vec::new()));
    let recv = captured.clone();
    fx.adapter
        .events()
        .events()
        .connect(move |event| recv.borrow_mut().push(event.clone()));

    fx.source.set_data(entries(&[('B', 0), ('C', 0), ('A', 0)]));
    clicks.emit(Ok(Click::LongPress));

    let events = captured.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].item().map(|entry| entry.id), Some('A'));
    assert_eq!(events[0].position(), Some(2));
}

#[test]
fn test_event_source_error_is_isolated() {
    let fx = fixture(&[('A', 0), ('B', 0)], true);
    let failing = clicks_of(&fx.adapter, 0);
    let healthy = clicks_of(&fx.adapter, 1);

    let errors = Rc::new(RefCell::new(Vec::new()));
    let recv = errors.clone();
    fx.adapter
        .events()
        .errors()
        .connect(move |err| recv.borrow_mut().push(err.error.message().to_string()));
    let payloads = Rc::new(RefCell::new(Vec::new()));
    let recv = payloads.clone();
    fx.adapter.events().events().connect(move |event| {
        recv.borrow_mut()
            .push((event.item().map(|entry| entry.id), event.payload().clone()));
    });

    failing.emit(Err(EventSourceError::new("gesture detector crashed")));
    failing.emit(Ok(Click::Tap));
    healthy.emit(Ok(Click::Tap));

    assert_eq!(*errors.borrow(), vec!["gesture detector crashed"]);
    assert_eq!(*payloads.borrow(), vec![(Some('B'), Click::Tap)]);
    assert_eq!(fx.adapter.events().subscription_count(), 1);
    assert_eq!(failing.connection_count(), 0);

    // Re-attaching the slot opens a fresh subscription
    let slot = fx.adapter.slot_at(0).unwrap();
    fx.adapter.detach_slot(slot).unwrap();
    fx.adapter.attach_slot(slot).unwrap();
    failing.emit(Ok(Click::LongPress));
    assert_eq!(payloads.borrow().last(), Some(&(Some('A'), Click::LongPress)));
}

#[test]
fn test_same_slot_event_order_preserved() {
    let fx = fixture(&[('A', 0)], true);
    let clicks = clicks_of(&fx.adapter, 0);
    let receiver = fx.adapter.events().channel();

    clicks.emit(Ok(Click::Tap));
    clicks.emit(Ok(Click::LongPress));
    clicks.emit(Ok(Click::Tap));

    let drained: Vec<Click> = receiver.try_iter().map(|event| event.into_payload()).collect();
    assert_eq!(drained, vec![Click::Tap, Click::LongPress, Click::Tap]);
}

#[test]
fn test_detached_slot_reattaches_without_rebind() {
    let fx = fixture(&[('A', 0), ('B', 0)], true);
    let slot = fx.adapter.slot_at(1).unwrap();

    fx.adapter.detach_slot(slot).unwrap();
    assert_eq!(fx.adapter.slot_state(slot), Some(SlotState::Detached));
    assert_eq!(fx.adapter.slot_item(slot), None);
    assert_eq!(fx.adapter.events().subscription_count(), 1);

    fx.adapter.attach_slot(slot).unwrap();
    assert_eq!(fx.adapter.slot_item(slot), Some(Entry { id: 'B', version: 0 }));
    assert_eq!(fx.adapter.events().subscription_count(), 2);
    assert!(fx.log.borrow().is_empty());

    assert!(matches!(
        fx.adapter.attach_slot(slot),
        Err(AdapterError::InvalidTransition {
            action: "attach",
            state: SlotState::Attached
        })
    ));
}

#[test]
fn test_recycled_slot_handle_is_stale() {
    let fx = fixture(&[('A', 0), ('B', 0)], true);
    let slot = fx.adapter.slot_at(0).unwrap();

    fx.adapter.recycle_slot(slot).unwrap();
    assert_eq!(fx.adapter.slot_at(0), None);
    assert_eq!(fx.adapter.slot_item(slot), None);
    assert!(matches!(
        fx.adapter.detach_slot(slot),
        Err(AdapterError::StaleSlot { .. })
    ));

    // The next layout pass refills the position from the pool
    fx.adapter.layout().unwrap();
    let refilled = fx.adapter.slot_at(0).unwrap();
    assert_eq!(refilled.key(), slot.key());
    assert_ne!(refilled, slot);
    assert_eq!(*fx.log.borrow(), vec!["bind A0@0"]);
}

#[test]
fn test_reentrant_set_data_is_queued() {
    let fx = fixture(&[('A', 0)], true);
    let weak = Rc::downgrade(&fx.source);
    let fired = Rc::new(RefCell::new(false));
    let once = fired.clone();
    fx.adapter.signals().script_applied.connect(move |_| {
        if once.replace(true) {
            return;
        }
        if let Some(source) = weak.upgrade() {
            source.set_data(entries(&[('A', 0), ('B', 0), ('C', 0)]));
        }
    });

    fx.source.set_data(entries(&[('A', 0), ('B', 0)]));

    assert_eq!(
        shown(&fx.adapter),
        vec![Some(('A', 0)), Some(('B', 0)), Some(('C', 0))]
    );
    assert_eq!(fx.adapter.take_error(), None);
}

#[test]
fn test_nested_set_data_seen_first_still_converges() {
    init_tracing();
    let source = Rc::new(AdapterSource::with_config(
        entries(&[('a', 0), ('b', 0), ('c', 0)]),
        SingleLayout::new(TemplateId(0)),
        SourceConfig::new(),
    ));

    // Connected before the adapter, so it runs first on every script
    let weak = Rc::downgrade(&source);
    let fired = Rc::new(RefCell::new(false));
    let once = fired.clone();
    source.signals().edit_script.connect(move |_| {
        if once.replace(true) {
            return;
        }
        if let Some(source) = weak.upgrade() {
            source.set_data(entries(&[('a', 0), ('c', 0), ('e', 0)]));
        }
    });

    let log = Rc::new(RefCell::new(Vec::new()));
    let created = Rc::new(RefCell::new(0));
    let adapter = ReconcilingAdapter::new(Rc::clone(&source), surface(&log, &created));
    adapter.attach_to_surface().unwrap();

    source.set_data(entries(&[('a', 0), ('c', 0), ('b', 0)]));

    assert_eq!(source.revision(), 2);
    assert_eq!(
        shown(&adapter),
        vec![Some(('a', 0)), Some(('c', 0)), Some(('e', 0))]
    );
    assert_eq!(adapter.take_error(), None);

    // Later scripts apply incrementally again
    log.borrow_mut().clear();
    source.set_data(entries(&[('a', 0), ('c', 0), ('e', 1)]));
    assert_eq!(*log.borrow(), vec!["bind e1@2"]);
}

#[derive(Debug, Clone, PartialEq)]
enum Feed {
    Header(String),
    Post(u32),
    Ad(u32),
}

impl DiffItem for Feed {}

impl Classify for Feed {
    fn view_type(&self) -> ViewType {
        match self {
            Feed::Header(_) => ViewType(0),
            Feed::Post(_) => ViewType(1),
            Feed::Ad(_) => ViewType(2),
        }
    }
}

struct FeedCell;

impl RenderUnit<Feed> for FeedCell {
    type Event = ();

    fn bind(&mut self, _item: &Feed, _position: usize) {}
}

#[test]
fn test_template_failure_is_fatal_for_view_type() {
    init_tracing();
    let layouts = VariantLayouts::new()
        .with(ViewType(0), TemplateId(10))
        .with(ViewType(1), TemplateId(11))
        .with(ViewType(2), TemplateId(12));
    let source = Rc::new(AdapterSource::new(
        vec![Feed::Header("Today".into()), Feed::Ad(1), Feed::Post(1)],
        layouts,
    ));
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let record = attempts.clone();
    let surface = move |template: TemplateId| {
        record.borrow_mut().push(template);
        if template == TemplateId(12) {
            Err(InstantiateError::new("ad template failed to load"))
        } else {
            Ok(FeedCell)
        }
    };
    let adapter = ReconcilingAdapter::new(Rc::clone(&source), surface);
    let failures = Rc::new(RefCell::new(Vec::new()));
    let recv = failures.clone();
    adapter
        .signals()
        .construction_failed
        .connect(move |err| recv.borrow_mut().push(err.clone()));

    let result = adapter.attach_to_surface();
    assert!(matches!(
        result,
        Err(AdapterError::Instantiate {
            view_type: ViewType(2),
            template: TemplateId(12),
            ..
        })
    ));
    assert!(adapter.is_view_type_failed(ViewType(2)));
    assert!(adapter.slot_at(0).is_some());
    assert!(adapter.slot_at(1).is_none());
    assert!(adapter.slot_at(2).is_some());

    source.set_data(vec![
        Feed::Header("Today".into()),
        Feed::Ad(1),
        Feed::Post(1),
        Feed::Ad(2),
        Feed::Post(2),
    ]);

    assert_eq!(failures.borrow().len(), 1);
    assert!(matches!(
        adapter.take_error(),
        Some(AdapterError::Instantiate { .. })
    ));
    let ad_attempts = attempts
        .borrow()
        .iter()
        .filter(|template| **template == TemplateId(12))
        .count();
    assert_eq!(ad_attempts, 1);
    assert!(adapter.slot_at(4).is_some());
}

#[test]
fn test_first_script_error_is_kept() {
    let layouts = VariantLayouts::new()
        .with(ViewType(1), TemplateId(11))
        .with(ViewType(2), TemplateId(12));
    let source = Rc::new(AdapterSource::new(vec![Feed::Post(1)], layouts));
    let adapter = ReconcilingAdapter::new(Rc::clone(&source), |template: TemplateId| {
        if template == TemplateId(12) {
            Err(InstantiateError::new("ad template failed to load"))
        } else {
            Ok(FeedCell)
        }
    });
    adapter.attach_to_surface().unwrap();

    // The second script fails differently, while the first is still being published
    let weak = Rc::downgrade(&source);
    let fired = Rc::new(RefCell::new(false));
    let once = fired.clone();
    adapter.signals().script_applied.connect(move |_| {
        if once.replace(true) {
            return;
        }
        if let Some(source) = weak.upgrade() {
            source.set_data(vec![Feed::Header("Top".into()), Feed::Post(1), Feed::Ad(1)]);
        }
    });

    source.set_data(vec![Feed::Post(1), Feed::Ad(1)]);

    assert!(adapter.is_view_type_failed(ViewType(0)));
    assert!(matches!(
        adapter.take_error(),
        Some(AdapterError::Instantiate {
            view_type: ViewType(2),
            ..
        })
    ));
    assert_eq!(adapter.take_error(), None);
}

#[test]
fn test_missing_template_is_reported() {
    let layouts = VariantLayouts::new().with(ViewType(1), TemplateId(11));
    let source = Rc::new(AdapterSource::new(
        vec![Feed::Post(1), Feed::Header("Later".into())],
        layouts,
    ));
    let adapter = ReconcilingAdapter::new(Rc::clone(&source), |_: TemplateId| {
        Ok::<_, InstantiateError>(FeedCell)
    });

    assert_eq!(
        adapter.attach_to_surface(),
        Err(AdapterError::TemplateUnavailable {
            view_type: ViewType(0)
        })
    );
    assert!(adapter.slot_at(0).is_some());
    assert!(adapter.slot_at(1).is_none());
}

#[test]
fn test_pools_are_per_template() {
    let layouts = VariantLayouts::new()
        .with(ViewType(0), TemplateId(10))
        .with(ViewType(1), TemplateId(11))
        .with(ViewType(2), TemplateId(12));
    let source = Rc::new(AdapterSource::new(
        vec![Feed::Header("Today".into()), Feed::Post(1), Feed::Post(2)],
        layouts,
    ));
    let created = Rc::new(RefCell::new(Vec::new()));
    let record = created.clone();
    let adapter = ReconcilingAdapter::with_config(
        Rc::clone(&source),
        move |template: TemplateId| {
            record.borrow_mut().push(template);
            Ok::<_, InstantiateError>(FeedCell)
        },
        AdapterConfig::new().max_pooled_per_template(2),
    );
    adapter.attach_to_surface().unwrap();

    source.set_data(vec![Feed::Header("Today".into())]);
    assert_eq!(adapter.pooled_count(TemplateId(11)), 2);
    assert_eq!(adapter.pooled_count(TemplateId(10)), 0);

    source.set_data(vec![Feed::Header("Today".into()), Feed::Ad(7), Feed::Post(3)]);
    assert_eq!(adapter.pooled_count(TemplateId(11)), 1);
    assert_eq!(
        *created.borrow(),
        vec![TemplateId(10), TemplateId(11), TemplateId(11), TemplateId(12)]
    );
}
