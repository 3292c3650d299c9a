use bson::{Bson, Document};
use nexusqb::{MemoryStore, QueryBuilder};
use proptest::prelude::*;
use std::collections::HashMap;

fn qb() -> QueryBuilder {
    QueryBuilder::new(MemoryStore::shared("prop"))
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        cases: 64,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_where_keeps_last_value_per_field(writes in proptest::collection::vec(("[a-e]", any::<i32>()), 0..30)) {
        let mut q = qb();
        let mut expected: HashMap<String, i32> = HashMap::new();
        for (f, v) in &writes {
            q.where_eq(f, *v);
            expected.insert(f.clone(), *v);
        }
        let filter = q.snapshot().filter;
        prop_assert_eq!(filter.len(), expected.len());
        for (f, v) in expected {
            prop_assert_eq!(filter.get(&f), Some(&Bson::Int32(v)));
        }
    }

    #[test]
    fn prop_range_operators_accumulate(lo in any::<i32>(), hi in any::<i32>(), ne in any::<i32>()) {
        let mut q = qb();
        q.where_gt("age", lo).where_lte("age", hi).where_ne("age", ne);
        let ops = q.snapshot().filter.get_document("age").unwrap().clone();
        let keys: Vec<&str> = ops.keys().map(String::as_str).collect();
        prop_assert_eq!(keys, vec!["$gt", "$lte", "$ne"]);
    }

    #[test]
    fn prop_invalid_limit_is_ignored(good in 1_i64..10_000, bad in i64::MIN..1) {
        let mut q = qb();
        q.limit(good).limit(bad).limit("not a number");
        prop_assert_eq!(q.snapshot().limit, good);
    }

    #[test]
    fn prop_offset_accepts_non_negative(off in 0_i64..1_000_000, bad in i64::MIN..0) {
        let mut q = qb();
        q.offset(off).offset(bad);
        prop_assert_eq!(q.snapshot().offset, off);
    }

    #[test]
    fn prop_inc_map_is_one_payload(vals in proptest::collection::vec(any::<i32>(), 1..6)) {
        let mut q = qb();
        let map: Document = vals.iter().enumerate().map(|(i, v)| (format!("f{i}"), Bson::Int32(*v))).collect();
        q.inc_all(map.clone());
        prop_assert_eq!(q.snapshot().update, bson::doc! {"$inc": map});
    }
}
