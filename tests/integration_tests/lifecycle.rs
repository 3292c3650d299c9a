use bson::doc;
use nexusqb::query::{DEFAULT_LIMIT, DEFAULT_OFFSET};
use nexusqb::{Action, MemoryStore, QbError, QueryBuilder, StoreError};
use std::sync::Arc;

use super::_support::FailingStore;

#[test]
fn terminal_call_resets_limit_and_offset() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("reset"));
    qb.limit(5).offset(10);
    qb.count("anything").unwrap();
    assert_eq!(qb.last_query().limit, 5);
    assert_eq!(qb.last_query().offset, 10);
    let fresh = qb.where_eq("a", 1).snapshot();
    assert_eq!((fresh.limit, fresh.offset), (DEFAULT_LIMIT, DEFAULT_OFFSET));
}

#[test]
fn every_terminal_call_records_its_action() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("actions"));
    qb.insert("c", doc! {"a": 1}).unwrap();
    assert_eq!(qb.last_query().action, Some(Action::Insert));
    qb.batch_insert("c", vec![doc! {"a": 2}]).unwrap();
    assert_eq!(qb.last_query().action, Some(Action::BatchInsert));
    qb.list_indexes("c").unwrap();
    assert_eq!(qb.last_query().action, Some(Action::ListIndexes));
    qb.where_eq("a", 2).delete("c").unwrap();
    assert_eq!(qb.last_query().action, Some(Action::Delete));
    assert_eq!(qb.last_query().filter, doc! {"a": 2});
    qb.drop_collection("c").unwrap();
    assert_eq!(qb.last_query().action, Some(Action::DropCollection));
}

#[test]
fn accumulated_state_is_cleared_even_by_insert() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("insert_reset"));
    qb.where_eq("x", 1).set("y", 2).select(&["x"], &[]);
    qb.insert("c", doc! {"k": "v"}).unwrap();
    let s = qb.snapshot();
    assert!(s.filter.is_empty() && s.update.is_empty() && s.projection.is_empty());
    assert_eq!(qb.last_query().filter, doc! {"x": 1});
}

#[test]
fn store_failure_preserves_everything() {
    let store = Arc::new(FailingStore::default());
    let mut qb = QueryBuilder::new(store.clone());
    qb.where_gt("age", 18).set("adult", true).order_by_field("age", -1).limit(7).offset(2);
    let before = qb.snapshot();

    let err = qb.update_all("people").unwrap_err();
    match err {
        QbError::Store { action, ref collection, ref source } => {
            assert_eq!(action, Action::UpdateAll);
            assert_eq!(collection, "people");
            assert!(matches!(source, StoreError::Connection(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(qb.snapshot(), before);
    assert!(qb.last_query().is_empty());

    assert!(qb.get("people").is_err());
    assert!(qb.count("people").is_err());
    assert!(qb.delete_all("people").is_err());
    assert!(qb.command(&doc! {"ping": 1}).is_err());
    assert_eq!(qb.snapshot(), before);
    assert_eq!(store.call_count(), 5);
}

#[test]
fn failure_does_not_replace_previous_log() {
    let store = MemoryStore::shared("mixed");
    let mut good = QueryBuilder::new(store);
    good.where_eq("a", 1).count("c").unwrap();
    let logged = good.last_query().clone();

    good.where_eq("a", 2);
    assert!(good.add_index("c", &doc! {}, &doc! {}).unwrap_err().is_configuration());
    assert_eq!(good.last_query(), &logged);
    assert_eq!(good.snapshot().filter, doc! {"a": 2});
}

#[test]
fn configuration_errors_never_reach_the_store() {
    let store = Arc::new(FailingStore::default());
    let mut qb = QueryBuilder::new(store.clone());
    assert!(qb.get("").unwrap_err().is_configuration());
    assert!(qb.count(" ").unwrap_err().is_configuration());
    assert!(qb.insert("c", doc! {}).unwrap_err().is_configuration());
    assert!(qb.batch_insert("c", vec![doc! {}]).unwrap_err().is_configuration());
    assert!(qb.update("c").unwrap_err().is_configuration());
    assert!(qb.remove_index("c", &doc! {}).unwrap_err().is_configuration());
    assert!(qb.drop_collection("").unwrap_err().is_configuration());
    assert_eq!(store.call_count(), 0);
}

#[test]
fn query_log_serializes() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("serde"));
    qb.where_eq("a", 1).order_by_field("a", "desc").count("c").unwrap();
    let json = serde_json::to_value(qb.last_query()).unwrap();
    assert_eq!(json["collection"], "c");
    assert_eq!(json["action"], "count");
    let back: nexusqb::QueryLog = serde_json::from_value(json).unwrap();
    assert_eq!(back.action, Some(Action::Count));
    assert_eq!(back.limit, DEFAULT_LIMIT);
}
