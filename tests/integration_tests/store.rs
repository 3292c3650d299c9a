use bson::doc;
use nexusqb::store::{Cursor, MemoryStore, Store, apply_update, matches, project};

#[test]
fn compiled_like_pattern_evaluates() {
    let pattern = nexusqb::query::like_pattern("j.o", &nexusqb::LikeOptions::default());
    let filter = doc! {"name": pattern.to_document()};
    assert!(matches(&doc! {"name": "Mr J.O. Smith"}, &filter).unwrap());
    assert!(!matches(&doc! {"name": "jxo"}, &filter).unwrap());
}

#[test]
fn find_then_shape_with_cursor() {
    let store = MemoryStore::new("cursor");
    for n in 1..=5 {
        store.insert("n", doc! {"n": n, "odd": n % 2 == 1}, &doc! {}).unwrap();
    }
    let out: Vec<i32> = store
        .find("n", &doc! {"odd": true}, &doc! {"_id": 0})
        .unwrap()
        .sort(doc! {"n": -1})
        .limit(2)
        .map(|d| d.get_i32("n").unwrap())
        .collect();
    assert_eq!(out, [5, 3]);
}

#[test]
fn nested_updates_and_projection() {
    let mut d = doc! {"_id": 1, "profile": {"name": "Ann", "visits": 1}};
    apply_update(&mut d, &doc! {"$inc": {"profile.visits": 2}, "$set": {"profile.city": "Oslo"}}).unwrap();
    assert_eq!(
        project(&d, &doc! {"profile.visits": 1, "_id": 0}),
        doc! {"profile": {"visits": 3}}
    );
}

#[test]
fn empty_cursor() {
    assert!(!Cursor::new(Vec::new()).has_next());
}
