use nexusqb::logger::build_config;
use nexusqb::utils::devlog;
use nexusqb::{MemoryStore, QueryBuilder};
use tempfile::tempdir;

#[test]
fn build_config_lays_out_log_files() {
    let dir = tempdir().unwrap();
    let cfg = build_config(Some(dir.path()), Some("debug"), Some(3), true).unwrap();
    let names: Vec<&str> = cfg.appenders().iter().map(|a| a.name()).collect();
    assert_eq!(names, ["app", "query", "dev6"]);
    assert!(dir.path().join("query.log").exists());
}

#[test]
fn dev6_sink_sees_compiled_requests() {
    let _g = devlog::enable_thread_sink();
    let mut qb = QueryBuilder::new(MemoryStore::shared("dev6"));
    qb.insert("c", bson::doc! {"a": 1}).unwrap();
    qb.where_eq("a", 1).set("a", 2).update("c").unwrap();
    let requests = devlog::drain_tagged(devlog::BUILDER_TAG);
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("[qb] insert on c"));
    assert!(requests[1].contains("update on c") && requests[1].contains("$set"));
    let rest = devlog::drain();
    assert!(rest.iter().any(|l| l.starts_with("[memory] insert into c")));
}

#[test]
fn sink_is_silent_when_disabled() {
    let mut qb = QueryBuilder::new(MemoryStore::shared("quiet"));
    qb.count("c").unwrap();
    assert!(devlog::drain().is_empty());
}
