use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tabular_model::{EntityId, HolderId, Model};
use tabular_refs::{ChangeScope, DependencyTracker, GraphStats, NotificationSink};

struct RecordingSink(Rc<RefCell<Vec<ChangeScope>>>);

impl NotificationSink for RecordingSink {
    fn structure_changed(&mut self, scope: ChangeScope) {
        self.0.borrow_mut().push(scope);
    }

    fn nodes_changed(&mut self, _holder: HolderId) {}
}

#[test]
fn deleting_a_referenced_entity_purges_every_edge_to_it() {
    let mut model = Model::new();
    let t = model.add_table("T").unwrap();
    let x = model.add_column(t, "X").unwrap();
    model.add_column(t, "Y").unwrap();
    let m1 = HolderId::Measure(model.add_measure(t, "M1", "[X] + [Y]").unwrap());
    let m2 = HolderId::Measure(model.add_measure(t, "M2", "[X] * 2").unwrap());

    let mut tracker = DependencyTracker::new();
    tracker.whole_model_rebuild(&model);
    assert_eq!(
        tracker.referenced_by(EntityId::Column(x)),
        vec![m1, m2]
    );

    model.remove_column(x).unwrap();
    tracker.notify_deleted(&model, EntityId::Column(x));

    assert!(tracker.referenced_by(EntityId::Column(x)).is_empty());
    assert!(tracker
        .depends_on(m1)
        .iter()
        .all(|e| e.target != EntityId::Column(x)));
    assert!(tracker.depends_on(m2).is_empty());
    // M1 still depends on Y.
    assert_eq!(tracker.depends_on(m1).len(), 1);
}

#[test]
fn deleting_a_holder_detaches_it_from_every_target() {
    let mut model = Model::new();
    let t = model.add_table("T").unwrap();
    let x = model.add_column(t, "X").unwrap();
    let gone = model.add_measure(t, "Gone", "[X] + COUNTROWS(T)").unwrap();
    let holder = HolderId::Measure(gone);

    let mut tracker = DependencyTracker::new();
    tracker.whole_model_rebuild(&model);
    assert_eq!(tracker.referenced_by(EntityId::Column(x)), vec![holder]);
    assert_eq!(tracker.referenced_by(EntityId::Table(t)), vec![holder]);

    model.remove_measure(gone).unwrap();
    tracker.notify_deleted(&model, EntityId::Measure(gone));

    assert!(tracker.referenced_by(EntityId::Column(x)).is_empty());
    assert!(tracker.referenced_by(EntityId::Table(t)).is_empty());
    assert!(tracker.depends_on(holder).is_empty());
    assert_eq!(
        tracker.graph().stats(),
        GraphStats {
            holders: 0,
            edges: 0,
            referenced_entities: 0
        }
    );
}

#[test]
fn deleting_a_measure_that_is_both_holder_and_target_cleans_both_roles() {
    let mut model = Model::new();
    let t = model.add_table("T").unwrap();
    model.add_column(t, "X").unwrap();
    let base = model.add_measure(t, "Base", "SUM(T[X])").unwrap();
    let derived = HolderId::Measure(model.add_measure(t, "Derived", "[Base] * 2").unwrap());

    let mut tracker = DependencyTracker::new();
    tracker.whole_model_rebuild(&model);

    model.remove_measure(base).unwrap();
    tracker.notify_deleted(&model, EntityId::Measure(base));

    // As a target: Derived no longer has an edge to it. As a holder: its
    // own edges are gone.
    assert!(tracker.depends_on(derived).is_empty());
    assert!(tracker.depends_on(HolderId::Measure(base)).is_empty());
    assert!(tracker
        .referenced_by(EntityId::Measure(base))
        .is_empty());
}

#[test]
fn dependents_of_a_deleted_entity_are_rebuilt_and_notified() {
    let mut model = Model::new();
    let t = model.add_table("T").unwrap();
    let x = model.add_column(t, "X").unwrap();
    let m = HolderId::Measure(model.add_measure(t, "M", "[X]").unwrap());

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut tracker = DependencyTracker::with_sink(Box::new(RecordingSink(log.clone())));
    tracker.whole_model_rebuild(&model);
    log.borrow_mut().clear();

    model.remove_column(x).unwrap();
    tracker.notify_deleted(&model, EntityId::Column(x));

    assert_eq!(&*log.borrow(), &[ChangeScope::Holder(m)]);
}

#[test]
fn table_deletion_in_a_batch_collapses_to_one_event() {
    let mut model = Model::new();
    let sales = model.add_table("Sales").unwrap();
    let dates = model.add_table("Dates").unwrap();
    model.add_column(sales, "Amount").unwrap();
    model.add_measure(sales, "Total", "SUM('Sales'[Amount])").unwrap();
    let r1 = HolderId::Measure(
        model
            .add_measure(dates, "R1", "'Sales'[Total] + 1")
            .unwrap(),
    );
    let r2 = HolderId::Measure(
        model
            .add_measure(dates, "R2", "COUNTROWS(Sales)")
            .unwrap(),
    );

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut tracker = DependencyTracker::with_sink(Box::new(RecordingSink(log.clone())));
    tracker.whole_model_rebuild(&model);
    log.borrow_mut().clear();

    let removed = model.remove_table(sales).unwrap();
    tracker.enter_batch();
    for entity in removed {
        tracker.notify_deleted(&model, entity);
    }
    tracker.exit_batch(&model);

    assert_eq!(&*log.borrow(), &[ChangeScope::Model]);
    assert!(tracker.depends_on(r1).is_empty());
    assert!(tracker.depends_on(r2).is_empty());
    assert!(tracker.referenced_by(EntityId::Table(sales)).is_empty());
}
