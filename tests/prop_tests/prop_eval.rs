use bson::doc;
use nexusqb::store::{MemoryStore, Store, matches};
use proptest::prelude::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_between_ne_is_exclusive(age in -100_i32..100, lo in -100_i32..100, span in 0_i32..50) {
        let hi = lo + span;
        let d = doc! {"age": age};
        let open = matches(&d, &doc! {"age": {"$gt": lo, "$lt": hi}}).unwrap();
        let closed = matches(&d, &doc! {"age": {"$gte": lo, "$lte": hi}}).unwrap();
        prop_assert_eq!(open, age > lo && age < hi);
        prop_assert_eq!(closed, age >= lo && age <= hi);
    }

    #[test]
    fn prop_sorted_find_is_non_decreasing(v in proptest::collection::vec((any::<i32>(), any::<i32>()), 0..20)) {
        let store = MemoryStore::new("prop_sort");
        for (a, b) in &v {
            store.insert("s", doc! {"a": *a, "b": *b}, &doc! {}).unwrap();
        }
        let docs = store.find("s", &doc! {}, &doc! {}).unwrap().sort(doc! {"a": 1, "b": 1}).to_vec();
        prop_assert_eq!(docs.len(), v.len());
        for w in docs.windows(2) {
            let k0 = (w[0].get_i32("a").unwrap(), w[0].get_i32("b").unwrap());
            let k1 = (w[1].get_i32("a").unwrap(), w[1].get_i32("b").unwrap());
            prop_assert!(k0 <= k1);
        }
    }
}
