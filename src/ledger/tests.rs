use crate::db::{ContainerId, CounterKey, CounterScope, ItemStore, NewItem, StatKind};
use crate::ledger::{AggregateLedger, ContainerCounts, LedgerError};
use crate::testing::{TestDb, TestForum, seed_discussion};

#[test]
fn test_apply_delta_walks_to_root() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let forum = TestForum::create(db);
    let ledger = AggregateLedger::load(db).unwrap();

    ledger.apply_delta(forum.a1, StatKind::NestedItem, 7).unwrap();

    assert_eq!(ledger.counts(forum.a1).unwrap().own.nested, 7);
    assert_eq!(ledger.counts(forum.a1).unwrap().aggregate.nested, 7);
    assert_eq!(ledger.counts(forum.a).unwrap().own.nested, 0);
    assert_eq!(ledger.counts(forum.a).unwrap().aggregate.nested, 7);
    assert_eq!(ledger.counts(forum.root).unwrap().aggregate.nested, 7);
    assert_eq!(ledger.counts(forum.b).unwrap().aggregate.nested, 0);
    assert!(ledger.verify().unwrap().is_empty());
}

#[test]
fn test_apply_zero_delta_is_noop() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let forum = TestForum::create(db);
    let ledger = AggregateLedger::load(db).unwrap();

    ledger.apply_delta(forum.a, StatKind::Item, 0).unwrap();
    assert_eq!(ledger.counts(forum.a).unwrap(), ContainerCounts::default());
}

#[test]
fn test_apply_delta_unknown_container() {
    let test_db = TestDb::new();
    let db = test_db.db();
    TestForum::create(db);
    let ledger = AggregateLedger::load(db).unwrap();

    let err = ledger
        .apply_delta(ContainerId::new(9999), StatKind::Item, 1)
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnknownContainer(_)));
}

#[test]
fn test_non_negative_clamp() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let forum = TestForum::create(db);
    let ledger = AggregateLedger::load(db).unwrap();

    for _ in 0..3 {
        ledger.apply_delta(forum.a1, StatKind::Item, -2).unwrap();
        ledger.apply_delta(forum.a1, StatKind::NestedItem, -5).unwrap();
    }

    for container in [forum.a1, forum.a, forum.root] {
        let counts = ledger.counts(container).unwrap();
        assert_eq!(counts.own.items, 0);
        assert_eq!(counts.aggregate.items, 0);
        assert_eq!(counts.aggregate.nested, 0);
    }
}

#[test]
fn test_refresh_root_restores_tree_invariant() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let forum = TestForum::create(db);
    let ledger = AggregateLedger::load(db).unwrap();

    // Content written behind the ledger's back
    let item = db.create_item(NewItem::discussion(forum.a1, "Raw", "")).unwrap();
    db.add_comment(item, "x").unwrap();
    db.add_comment(item, "y").unwrap();
    db.create_item(NewItem::discussion(forum.b, "Raw too", "")).unwrap();
    db.create_item(NewItem::discussion(forum.root, "Top", "")).unwrap();
    // and a corrupted counter
    db.set_counter(CounterKey::new(forum.a, CounterScope::Aggregate, StatKind::Item), 40)
        .unwrap();
    assert!(!ledger.verify().unwrap().is_empty());

    ledger.refresh(forum.root, db).unwrap();

    assert!(ledger.verify().unwrap().is_empty());
    let root = ledger.counts(forum.root).unwrap();
    assert_eq!(root.own.items, 1);
    assert_eq!(root.aggregate.items, 3);
    assert_eq!(root.aggregate.nested, 2);
    assert_eq!(ledger.counts(forum.a).unwrap().aggregate.items, 1);
}

#[test]
fn test_refresh_subtree_shifts_ancestors() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let forum = TestForum::create(db);
    let ledger = AggregateLedger::load(db).unwrap();
    seed_discussion(db, &ledger, forum.b, "Counted", 1);

    db.create_item(NewItem::discussion(forum.a1, "Uncounted", "")).unwrap();
    db.create_item(NewItem::discussion(forum.a1, "Uncounted 2", "")).unwrap();

    ledger.refresh(forum.a, db).unwrap();

    assert_eq!(ledger.counts(forum.a).unwrap().aggregate.items, 2);
    assert_eq!(ledger.counts(forum.root).unwrap().aggregate.items, 3);
    assert_eq!(ledger.counts(forum.root).unwrap().aggregate.nested, 1);
    assert!(ledger.verify().unwrap().is_empty());
}

#[test]
fn test_refresh_all_matches_store() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let forum = TestForum::create(db);
    let ledger = AggregateLedger::load(db).unwrap();
    seed_discussion(db, &ledger, forum.a1, "One", 2);
    seed_discussion(db, &ledger, forum.a, "Two", 0);
    let before = ledger.counts(forum.root).unwrap();

    ledger.refresh_all(db).unwrap();

    assert_eq!(ledger.counts(forum.root).unwrap(), before);
    assert_eq!(db.count_items(forum.a).unwrap(), 1);
}

#[test]
fn test_reload_picks_up_new_container() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let forum = TestForum::create(db);
    let mut ledger = AggregateLedger::load(db).unwrap();

    let late = db.create_container("late", Some(forum.b)).unwrap();
    assert!(ledger.counts(late).is_err());

    ledger.reload().unwrap();
    ledger.apply_delta(late, StatKind::Item, 1).unwrap();
    assert_eq!(ledger.counts(forum.root).unwrap().aggregate.items, 1);
    assert_eq!(ledger.index().parent(late), Some(forum.b));
}
