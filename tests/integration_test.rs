//! Integration tests for modr
//!
//! These tests verify end-to-end functionality by creating temporary databases
//! and driving the public API the way the CLI does.

use std::fs;

use modr::auth::{Capability, GrantTable};
use modr::cli::{IdFormat, InputArgs};
use modr::commands::ids;
use modr::config::ModrConfig;
use modr::content::{post_comment, post_item};
use modr::db::{ActorId, ContainerId, Database, ItemId, ItemKind, ItemStore, NewItem};
use modr::ledger::AggregateLedger;
use modr::moderation::{
    BatchState, CommentSelection, ErrorKind, ErrorResponse, ItemSelection, ModerationError, Moderator,
    MoveRequest, RedirectGenerator,
};
use modr::selection::{CheckToggle, Scope, SelectionKey, SelectionStore};
use tempfile::TempDir;

const MOD: ActorId = ActorId::new(1);

/// Helper function to create a temporary test database
fn setup_test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("db")).unwrap();
    (db, dir)
}

/// root -> {general -> {help}, archive}
struct Forum {
    root: ContainerId,
    general: ContainerId,
    help: ContainerId,
    archive: ContainerId,
}

fn build_forum(db: &Database) -> Forum {
    let root = db.create_container("Forum", None).unwrap();
    let general = db.create_container("General", Some(root)).unwrap();
    let help = db.create_container("Help", Some(general)).unwrap();
    let archive = db.create_container("Archive", Some(root)).unwrap();
    Forum {
        root,
        general,
        help,
        archive,
    }
}

fn post(db: &Database, ledger: &AggregateLedger<'_>, container: ContainerId, title: &str, comments: usize) -> ItemId {
    let item = post_item(db, ledger, NewItem::discussion(container, title, "body")).unwrap();
    for n in 0..comments {
        post_comment(db, ledger, item, &format!("reply {n}")).unwrap();
    }
    item
}

fn allow_all(_: ActorId, _: ContainerId, _: Capability) -> bool {
    true
}

#[test]
fn test_select_then_move_with_redirects() {
    let (db, _dir) = setup_test_db();
    let forum = build_forum(&db);
    let ledger = AggregateLedger::load(&db).unwrap();
    let first = post(&db, &ledger, forum.help, "Cannot log in", 2);
    let second = post(&db, &ledger, forum.help, "Password reset", 1);
    post(&db, &ledger, forum.general, "Welcome", 4);

    let selections = SelectionStore::new(&db);
    let toggles = [first, second].map(|id| CheckToggle {
        check_id: SelectionKey::discussion(id).to_string(),
        checked: true,
    });
    assert_eq!(selections.toggle_many(MOD, Scope::Global, &toggles).unwrap(), 2);

    let root_before = ledger.counts(forum.root).unwrap();
    let moderator = Moderator::new(&db, &ledger, SelectionStore::new(&db), &allow_all)
        .with_redirects(RedirectGenerator::new("https://forum.example", "Moved: {title}"));
    let report = moderator
        .move_items(
            MOD,
            &MoveRequest {
                items: ItemSelection::FromSelection,
                destination: forum.archive,
                leave_redirect: true,
            },
        )
        .unwrap();

    assert_eq!(report.state, BatchState::Committed);
    assert_eq!(report.processed, 2);

    // stubs replace the moved discussions in Help
    let help = ledger.counts(forum.help).unwrap();
    assert_eq!(help.own.items, 2);
    assert_eq!(help.own.nested, 0);
    let stubs = db.list_items(forum.help).unwrap();
    assert!(stubs.iter().all(|i| i.kind == ItemKind::Redirect));
    assert!(stubs.iter().any(|i| i.title == "Moved: Cannot log in"));

    let archive = ledger.counts(forum.archive).unwrap();
    assert_eq!(archive.own.items, 2);
    assert_eq!(archive.own.nested, 3);

    // comments moved within the same root, stubs added two items
    let root_after = ledger.counts(forum.root).unwrap();
    assert_eq!(root_after.aggregate.nested, root_before.aggregate.nested);
    assert_eq!(root_after.aggregate.items, root_before.aggregate.items + 2);

    assert!(ledger.verify().unwrap().is_empty());
    assert!(selections.get(MOD, Scope::Global).unwrap().is_empty());
    assert!(selections.summary(MOD).unwrap().is_empty());
}

#[test]
fn test_delete_from_file_and_comment_selection() {
    let (db, dir) = setup_test_db();
    let forum = build_forum(&db);
    let ledger = AggregateLedger::load(&db).unwrap();
    let spam = post(&db, &ledger, forum.general, "Buy now", 3);
    let keep = post(&db, &ledger, forum.help, "Real question", 2);

    let list = dir.path().join("ids.csv");
    fs::write(&list, format!("{spam},spam\n999,gone\n")).unwrap();
    let input = InputArgs {
        input: Some(list),
        format: IdFormat::Csv,
        delimiter: ',',
    };
    let explicit = ids::collect(&[], &input).unwrap();

    let moderator = Moderator::new(&db, &ledger, SelectionStore::new(&db), &allow_all);
    let report = moderator
        .delete_items(MOD, &ItemSelection::Explicit(explicit.into_iter().map(ItemId::new).collect()))
        .unwrap();
    assert_eq!(report.total_checked, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(report.not_allowed, 1);
    assert!(db.get_item(spam).unwrap().is_none());

    let general = ledger.counts(forum.general).unwrap();
    assert_eq!(general.own.items, 0);
    assert_eq!(general.aggregate.items, 1);
    assert_eq!(general.aggregate.nested, 2);

    // select one comment of the kept discussion and delete it
    let comments = db.list_comments(keep).unwrap();
    let selections = SelectionStore::new(&db);
    selections
        .toggle(MOD, Scope::Parent(keep), SelectionKey::comment(comments[0].id), true)
        .unwrap();
    let report = moderator
        .delete_comments(MOD, keep, &CommentSelection::FromSelection)
        .unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(ledger.counts(forum.help).unwrap().own.nested, 1);
    assert_eq!(ledger.counts(forum.root).unwrap().aggregate.nested, 1);
    assert!(selections.get(MOD, Scope::Parent(keep)).unwrap().is_empty());
    assert!(ledger.verify().unwrap().is_empty());
}

#[test]
fn test_grants_from_config_gate_moves() {
    let (db, dir) = setup_test_db();
    let forum = build_forum(&db);
    let ledger = AggregateLedger::load(&db).unwrap();
    let item = post(&db, &ledger, forum.help, "Question", 0);

    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[[grants]]
actor = 1
container = {help}
capabilities = ["edit", "delete"]
"#,
            help = forum.help
        ),
    )
    .unwrap();
    let config = ModrConfig::load_from(&config_path).unwrap();
    let grants: GrantTable = config.grant_table();
    let moderator = Moderator::new(&db, &ledger, SelectionStore::new(&db), &grants)
        .with_policy(config.moderation_policy());

    let before = ledger.counts(forum.root).unwrap();
    let err = moderator
        .move_items(
            MOD,
            &MoveRequest {
                items: ItemSelection::Explicit(vec![item]),
                destination: forum.archive,
                leave_redirect: false,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ModerationError::Forbidden { capability: Capability::Add, .. }));

    let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
    assert_eq!(body["kind"], "forbidden");
    assert!(body.get("report").is_none());
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    assert_eq!(ledger.counts(forum.root).unwrap(), before);
    assert_eq!(db.get_item(item).unwrap().unwrap().container, forum.help);
}

#[test]
fn test_refresh_repairs_counters_after_direct_writes() {
    let (db, _dir) = setup_test_db();
    let forum = build_forum(&db);
    let ledger = AggregateLedger::load(&db).unwrap();
    post(&db, &ledger, forum.help, "Counted", 1);

    // bypass the ledger entirely
    db.create_item(NewItem::discussion(forum.help, "Uncounted", "")).unwrap();
    assert_eq!(ledger.counts(forum.help).unwrap().own.items, 1);

    ledger.refresh_all(&db).unwrap();
    assert_eq!(ledger.counts(forum.help).unwrap().own.items, 2);
    assert_eq!(ledger.counts(forum.general).unwrap().aggregate.items, 2);
    assert_eq!(ledger.counts(forum.root).unwrap().aggregate.items, 2);
    assert_eq!(ledger.counts(forum.root).unwrap().aggregate.nested, 1);
    assert!(ledger.verify().unwrap().is_empty());
}

#[test]
fn test_counters_and_selections_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db");
    let (help, item) = {
        let db = Database::open(&path).unwrap();
        let forum = build_forum(&db);
        let ledger = AggregateLedger::load(&db).unwrap();
        let item = post(&db, &ledger, forum.help, "Persisted", 2);
        SelectionStore::new(&db)
            .toggle(MOD, Scope::Global, SelectionKey::discussion(item), true)
            .unwrap();
        db.flush().unwrap();
        (forum.help, item)
    };

    let db = Database::open(&path).unwrap();
    let ledger = AggregateLedger::load(&db).unwrap();
    let counts = ledger.counts(help).unwrap();
    assert_eq!(counts.own.items, 1);
    assert_eq!(counts.own.nested, 2);
    assert!(ledger.verify().unwrap().is_empty());
    assert_eq!(
        SelectionStore::new(&db).get(MOD, Scope::Global).unwrap(),
        vec![SelectionKey::discussion(item)]
    );
}
