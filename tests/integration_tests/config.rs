use nexusqb::{BuilderConfig, MemoryStore, QbError, QueryBuilder};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn config_file_drives_store_and_builder() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nexusqb.toml");
    std::fs::write(
        &path,
        "dsn = \"mongodb://localhost:27017/mongoqbtest\"\nquery_safety = \"w\"\nreplica_set = \"rs0\"\n",
    )
    .unwrap();
    let cfg = BuilderConfig::load(&path).unwrap();
    let settings = cfg.validate().unwrap();
    assert_eq!(settings.replica_set.as_deref(), Some("rs0"));

    let store = Arc::new(MemoryStore::connect(&cfg).unwrap());
    assert_eq!(store.database(), "mongoqbtest");
    let mut qb = QueryBuilder::with_config(store, &cfg).unwrap();
    assert!(qb.insert("c", bson::doc! {"a": 1}).unwrap().is_some());
}

#[test]
fn malformed_toml_is_reported() {
    let err = BuilderConfig::from_toml_str("dsn = ").unwrap_err();
    assert!(matches!(err, QbError::Toml(_)));
}

#[test]
fn bad_dsn_is_a_configuration_error() {
    let err = MemoryStore::connect(&BuilderConfig::with_dsn("mongodb://localhost:27017")).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().starts_with("Configuration error"));
}
