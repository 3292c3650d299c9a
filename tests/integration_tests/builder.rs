use bson::{Bson, doc};
use nexusqb::{LikeOptions, MemoryStore, QueryBuilder};

use super::_support::seed_people;

fn seeded() -> QueryBuilder {
    let mut qb = QueryBuilder::new(MemoryStore::shared("builder_it"));
    seed_people(&mut qb);
    qb
}

fn names(docs: &[bson::Document]) -> Vec<String> {
    docs.iter().map(|d| d.get_str("firstname").unwrap().to_string()).collect()
}

#[test]
fn insert_then_where_gt_get() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("people_db"));
    let id = qb.insert("people", doc! {"firstname": "John", "age": 22}).unwrap();
    assert!(matches!(id, Some(Bson::ObjectId(_))));
    let found = qb.where_gt("age", 18).get("people").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_str("firstname").unwrap(), "John");
}

#[test]
fn between_ne_has_exclusive_bounds() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("between"));
    qb.insert("p", doc! {"age": 22}).unwrap();
    assert_eq!(qb.where_between_ne("age", 18, 25).count("p").unwrap(), 1);
    qb.set("age", 25).update_all("p").unwrap();
    assert_eq!(qb.where_between_ne("age", 18, 25).count("p").unwrap(), 0);
    assert_eq!(qb.where_between("age", 18, 25).count("p").unwrap(), 1);
}

#[test]
fn range_on_one_field_combines() {
    let mut qb = seeded();
    let got = qb.where_gt("age", 18).where_lte("age", 30).order_by_field("age", 1).get("people").unwrap();
    assert_eq!(names(&got), ["John", "Jane"]);
}

#[test]
fn or_where_matches_either_branch() {
    let mut qb = seeded();
    let got = qb
        .or_where(doc! {"firstname": "Bob", "age": 12})
        .order_by(doc! {"age": "desc"})
        .get("people")
        .unwrap();
    assert_eq!(names(&got), ["Bob", "Kid"]);
}

#[test]
fn membership_predicates() {
    let mut qb = seeded();
    assert_eq!(qb.where_in("firstname", vec!["John", "Bob"]).count("people").unwrap(), 2);
    assert_eq!(qb.where_not_in("surname", vec!["Smith"]).count("people").unwrap(), 2);
    assert_eq!(qb.where_in_all("tags", vec!["a"]).count("people").unwrap(), 1);
    assert_eq!(qb.where_ne("surname", "Smith").count("people").unwrap(), 2);
}

#[test]
fn like_variants() {
    let mut qb = seeded();
    assert_eq!(names(&qb.where_like("surname", "OHN").get("people").unwrap()), ["Bob"]);

    let anchored = LikeOptions::default().anchored(true, false);
    assert!(qb.where_like_with("surname", "ohn", &anchored).get("people").unwrap().is_empty());
    assert_eq!(qb.where_like_with("surname", "john", &anchored).count("people").unwrap(), 1);

    let exact = LikeOptions::default().flags("").anchored(true, true);
    assert_eq!(qb.where_like_with("surname", "smith", &exact).count("people").unwrap(), 0);
    assert_eq!(qb.where_like_with("surname", "Smith", &exact).count("people").unwrap(), 2);
}

#[test]
fn select_and_order() {
    let mut qb = seeded();
    let got = qb.select(&["firstname"], &[]).order_by_field("age", "desc").limit(2).get("people").unwrap();
    assert_eq!(names(&got), ["Bob", "Jane"]);
    assert!(got.iter().all(|d| d.contains_key("_id") && !d.contains_key("age")));

    let got = qb.select(&[], &["_id", "tags"]).where_eq("firstname", "John").get("people").unwrap();
    assert_eq!(got, vec![doc! {"firstname": "John", "surname": "Smith", "age": 22}]);
}

#[test]
fn offset_and_limit_page_through() {
    let mut qb = seeded();
    let page = qb.order_by_field("age", 1).offset(1).limit(2).get("people").unwrap();
    assert_eq!(names(&page), ["John", "Jane"]);
    assert_eq!(qb.offset(3).count("people").unwrap(), 1);
}

#[test]
fn get_where_merges_then_fetches() {
    let mut qb = seeded();
    let got = qb.get_where("people", doc! {"surname": "Smith", "age": 12}).unwrap();
    assert_eq!(names(&got), ["Kid"]);
}

#[test]
fn cursor_is_lazy_and_iterable() {
    let mut qb = seeded();
    let mut cur = qb.order_by_field("age", -1).get_cursor("people").unwrap();
    assert!(cur.has_next());
    assert_eq!(cur.next().unwrap().get_str("firstname").unwrap(), "Bob");
    assert_eq!(cur.count(), 3);
}

#[test]
fn update_operators_against_store() {
    let mut qb = seeded();
    qb.where_eq("firstname", "John")
        .inc("age", 1)
        .set("city", "Paris")
        .unset_field("surname")
        .push("scores", 10)
        .rename_field("firstname", "name");
    assert_eq!(qb.update("people").unwrap(), Some(1));

    let john = qb.where_eq("name", "John").get("people").unwrap().remove(0);
    assert_eq!(john.get_i32("age").unwrap(), 23);
    assert_eq!(john.get_str("city").unwrap(), "Paris");
    assert!(!john.contains_key("surname") && !john.contains_key("firstname"));
    assert_eq!(john.get_array("scores").unwrap(), &vec![Bson::Int32(10)]);
}

#[test]
fn dec_adds_the_value_as_given() {
    let mut qb = seeded();
    qb.where_eq("firstname", "Jane").dec("age", -5).update("people").unwrap();
    let jane = qb.where_eq("firstname", "Jane").get("people").unwrap().remove(0);
    assert_eq!(jane.get_i32("age").unwrap(), 20);
}

#[test]
fn add_each_to_set_and_pop_and_pull() {
    let mut qb = seeded();
    qb.where_eq("firstname", "Bob").add_each_to_set("tags", vec!["x", "y", "x"]);
    assert_eq!(qb.snapshot().update, doc! {"$addToSet": {"tags": {"$each": ["x", "y", "x"]}}});
    qb.update("people").unwrap();

    qb.where_eq("firstname", "Bob").pop("tags").update("people").unwrap();
    let bob = qb.where_eq("firstname", "Bob").get("people").unwrap().remove(0);
    assert_eq!(bob.get_array("tags").unwrap(), &vec![Bson::String("y".into())]);

    qb.where_eq("firstname", "Bob").pull("tags", "nope").pull("tags", "y").update("people").unwrap();
    let bob = qb.where_eq("firstname", "Bob").get("people").unwrap().remove(0);
    assert!(bob.get_array("tags").unwrap().is_empty());
}

#[test]
fn update_all_counts_matches() {
    let mut qb = seeded();
    assert_eq!(qb.where_eq("surname", "Smith").set("family", true).update_all("people").unwrap(), Some(2));
    assert_eq!(qb.where_eq("surname", "Nobody").set("x", 1).update_all("people").unwrap(), None);
    assert_eq!(
        qb.where_eq("surname", "Nobody")
            .set("x", 1)
            .update_with("people", &doc! {"upsert": true})
            .unwrap(),
        None
    );
    assert_eq!(qb.where_eq("surname", "Nobody").count("people").unwrap(), 1);
}

#[test]
fn delete_one_vs_all() {
    let mut qb = seeded();
    assert!(qb.where_eq("surname", "Smith").delete("people").unwrap());
    assert_eq!(qb.count("people").unwrap(), 3);
    assert!(qb.where_lt("age", 100).delete_all("people").unwrap());
    assert_eq!(qb.count("people").unwrap(), 0);
}

#[test]
fn index_admin_round_trip() {
    let mut qb = seeded();
    qb.add_index("people", &doc! {"age": "desc", "firstname": true}, &doc! {})
        .unwrap()
        .add_index("people", &doc! {"surname": 1}, &doc! {})
        .unwrap();
    let listed: Vec<String> = qb
        .list_indexes("people")
        .unwrap()
        .iter()
        .map(|d| d.get_str("name").unwrap().to_string())
        .collect();
    assert_eq!(listed, ["_id_", "age_-1_firstname_1", "surname_1"]);

    qb.remove_index("people", &doc! {"surname": 1}).unwrap();
    assert!(qb.remove_index("people", &doc! {"surname": 1}).is_err());
    qb.remove_all_indexes("people").unwrap();
    assert_eq!(qb.list_indexes("people").unwrap().len(), 1);
}

#[test]
fn drop_collection_and_command() {
    let mut qb = seeded();
    let res = qb.command(&doc! {"count": "people", "query": {"surname": "Smith"}}).unwrap();
    assert_eq!(res.get_i64("n").unwrap(), 2);
    assert!(qb.drop_collection("people").unwrap());
    assert!(!qb.drop_collection("people").unwrap());
    assert!(qb.command(&doc! {"unknownCommand": 1}).is_err());
}

#[test]
fn near_queries() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("geo"));
    qb.insert("places", doc! {"name": "palace", "loc": [-0.142, 51.501]}).unwrap();
    qb.insert("places", doc! {"name": "tower", "loc": [2.294, 48.858]}).unwrap();
    assert_eq!(qb.where_near("loc", vec![-0.14, 51.5], Some(0.1), false).count("places").unwrap(), 1);
    assert_eq!(qb.where_near("loc", vec![-0.14, 51.5], None, true).count("places").unwrap(), 2);
}

#[test]
fn order_by_object_id_descending() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("oid_sort"));
    let ids: Vec<bson::oid::ObjectId> = ["000000000000000000000002", "000000000000000000000003", "000000000000000000000001"]
        .iter()
        .map(|h| bson::oid::ObjectId::parse_str(h).unwrap())
        .collect();
    for id in &ids {
        qb.insert("c", doc! {"_id": *id}).unwrap();
    }
    let got: Vec<String> = qb
        .order_by_field("_id", -1)
        .get("c")
        .unwrap()
        .iter()
        .map(|d| d.get_object_id("_id").unwrap().to_hex())
        .collect();
    assert_eq!(got, ["000000000000000000000003", "000000000000000000000002", "000000000000000000000001"]);
}
