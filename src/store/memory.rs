//! In-process store. Collections live in a shared map behind a `parking_lot::RwLock`;
//! cloned handles see the same data.

use bson::{Bson, Document, doc, oid::ObjectId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::eval::{get_path, matches, values_equal};
use super::{Cursor, Store, StoreError, UpdateReport, apply_update};
use crate::config::BuilderConfig;
use crate::errors::QbError;
use crate::query::normalize;
use crate::utils::num::usize_to_u64;

const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone, PartialEq)]
struct IndexSpec {
    name: String,
    key: Document,
    unique: bool,
}

impl IndexSpec {
    fn describe(&self) -> Document {
        let mut d = doc! {"name": self.name.clone(), "key": self.key.clone()};
        if self.unique {
            d.insert("unique", true);
        }
        d
    }
}

#[derive(Debug, Default)]
struct CollectionData {
    docs: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl CollectionData {
    fn id_index() -> IndexSpec {
        IndexSpec { name: ID_INDEX.to_string(), key: doc! {"_id": 1}, unique: true }
    }

    fn new() -> Self {
        Self { docs: Vec::new(), indexes: vec![Self::id_index()] }
    }

    /// Rejects `candidate` when a unique index already holds its key values.
    fn check_unique(&self, candidate: &Document, skip: Option<usize>) -> Result<(), StoreError> {
        unique_clash(&self.indexes, &self.docs, candidate, skip)
    }

    fn matching(&self, filter: &Document) -> Result<Vec<usize>, StoreError> {
        let mut out = Vec::new();
        for (i, d) in self.docs.iter().enumerate() {
            if matches(d, filter)? {
                out.push(i);
            }
        }
        Ok(out)
    }
}

/// Checks `candidate` against `docs` for every unique index, ignoring the
/// document at position `skip`.
fn unique_clash(
    indexes: &[IndexSpec],
    docs: &[Document],
    candidate: &Document,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    for idx in indexes.iter().filter(|i| i.unique) {
        let key_of = |d: &Document| -> Vec<Bson> {
            idx.key.keys().map(|k| get_path(d, k).cloned().unwrap_or(Bson::Null)).collect()
        };
        let wanted = key_of(candidate);
        let clash = docs.iter().enumerate().any(|(i, d)| {
            Some(i) != skip && key_of(d).iter().zip(&wanted).all(|(a, b)| values_equal(a, b))
        });
        if clash {
            return Err(StoreError::Rejected(format!("duplicate key for index {}", idx.name)));
        }
    }
    Ok(())
}

/// Index name: each `field_dir` joined by `_`, e.g. `age_-1_name_1`.
fn index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(field, dir)| format!("{field}_{}", normalize(dir).as_i32()))
        .collect::<Vec<_>>()
        .join("_")
}

fn flag(options: &Document, key: &str) -> bool {
    options.get_bool(key).unwrap_or(false)
}

fn with_id(mut document: Document) -> (Document, Bson) {
    if let Some(id) = document.get("_id").cloned() {
        return (document, id);
    }
    let id = Bson::ObjectId(ObjectId::new());
    let mut stamped = doc! {"_id": id.clone()};
    for (k, v) in std::mem::take(&mut document) {
        stamped.insert(k, v);
    }
    (stamped, id)
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    database: String,
    inner: Arc<RwLock<HashMap<String, CollectionData>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self { database: database.into(), inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    #[must_use]
    pub fn shared(database: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(database))
    }

    /// Opens a store for the database named in `config`'s DSN.
    ///
    /// # Errors
    /// `Configuration` when the DSN is empty or names no database.
    pub fn connect(config: &BuilderConfig) -> Result<Self, QbError> {
        let settings = config.validate()?;
        log::info!("memory store opened for database `{}`", settings.database);
        Ok(Self::new(settings.database))
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn count_matching(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let guard = self.inner.read();
        let Some(data) = guard.get(collection) else {
            return Ok(0);
        };
        Ok(usize_to_u64(data.matching(filter)?.len()))
    }
}

impl Store for MemoryStore {
    fn find(
        &self,
        collection: &str,
        filter: &Document,
        projection: &Document,
    ) -> Result<Cursor, StoreError> {
        let guard = self.inner.read();
        let docs = match guard.get(collection) {
            Some(data) => {
                let ids = data.matching(filter)?;
                ids.into_iter().map(|i| data.docs[i].clone()).collect()
            }
            None => Vec::new(),
        };
        Ok(Cursor::new(docs).with_projection(projection.clone()))
    }

    fn count(
        &self,
        collection: &str,
        filter: &Document,
        limit: usize,
        skip: usize,
    ) -> Result<u64, StoreError> {
        let total = self.count_matching(collection, filter)?;
        let after_skip = total.saturating_sub(usize_to_u64(skip));
        Ok(if limit == 0 { after_skip } else { after_skip.min(usize_to_u64(limit)) })
    }

    fn insert(
        &self,
        collection: &str,
        document: Document,
        _options: &Document,
    ) -> Result<Option<Bson>, StoreError> {
        let (document, id) = with_id(document);
        let mut guard = self.inner.write();
        let data = guard.entry(collection.to_string()).or_insert_with(CollectionData::new);
        data.check_unique(&document, None)?;
        data.docs.push(document);
        crate::dev6!("{} insert into {collection}: {id}", crate::utils::devlog::MEMORY_TAG);
        Ok(Some(id))
    }

    fn batch_insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
        _options: &Document,
    ) -> Result<Document, StoreError> {
        let mut guard = self.inner.write();
        let data = guard.entry(collection.to_string()).or_insert_with(CollectionData::new);
        let before = data.docs.len();
        for document in documents {
            let (document, _) = with_id(document);
            if let Err(e) = data.check_unique(&document, None) {
                // all or nothing
                data.docs.truncate(before);
                return Err(e);
            }
            data.docs.push(document);
        }
        let n = i64::try_from(data.docs.len() - before).unwrap_or(i64::MAX);
        Ok(doc! {"ok": 1, "n": n})
    }

    fn update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: &Document,
    ) -> Result<UpdateReport, StoreError> {
        let multiple = flag(options, "multiple");
        let upsert = flag(options, "upsert");
        let mut guard = self.inner.write();
        let data = guard.entry(collection.to_string()).or_insert_with(CollectionData::new);
        let mut hits = data.matching(filter)?;
        if !multiple {
            hits.truncate(1);
        }

        if hits.is_empty() {
            if upsert {
                let mut seed: Document = filter
                    .iter()
                    .filter(|(k, v)| !k.starts_with('$') && !matches!(v, Bson::Document(_)))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                apply_update(&mut seed, update)?;
                let (seed, _) = with_id(seed);
                data.check_unique(&seed, None)?;
                data.docs.push(seed);
            }
            return Ok(UpdateReport::default());
        }

        // stage every change first so a failure leaves the collection intact
        let mut staged = Vec::with_capacity(hits.len());
        for &i in &hits {
            let mut next = data.docs[i].clone();
            let changed = apply_update(&mut next, update)?;
            staged.push((i, next, changed));
        }
        // staged documents must not clash with each other either
        let mut view = data.docs.clone();
        for (i, next, _) in &staged {
            view[*i] = next.clone();
        }
        for (i, next, _) in &staged {
            unique_clash(&data.indexes, &view, next, Some(*i))?;
        }
        let mut report = UpdateReport { matched: usize_to_u64(staged.len()), modified: 0 };
        for (i, next, changed) in staged {
            if changed {
                report.modified += 1;
            }
            data.docs[i] = next;
        }
        Ok(report)
    }

    fn remove(
        &self,
        collection: &str,
        filter: &Document,
        options: &Document,
    ) -> Result<bool, StoreError> {
        let just_one = flag(options, "justOne");
        let mut guard = self.inner.write();
        let Some(data) = guard.get_mut(collection) else {
            return Ok(true);
        };
        let mut hits = data.matching(filter)?;
        if just_one {
            hits.truncate(1);
        }
        for i in hits.into_iter().rev() {
            data.docs.remove(i);
        }
        Ok(true)
    }

    fn ensure_index(
        &self,
        collection: &str,
        keys: &Document,
        options: &Document,
    ) -> Result<bool, StoreError> {
        if keys.is_empty() {
            return Err(StoreError::InvalidOperation("index keys are empty".into()));
        }
        let mut guard = self.inner.write();
        let data = guard.entry(collection.to_string()).or_insert_with(CollectionData::new);
        let name = options.get_str("name").map_or_else(|_| index_name(keys), str::to_string);
        if data.indexes.iter().any(|i| i.name == name) {
            return Ok(true);
        }
        let spec = IndexSpec { name, key: keys.clone(), unique: flag(options, "unique") };
        if spec.unique {
            let mut seen = CollectionData { docs: Vec::new(), indexes: vec![spec.clone()] };
            for d in &data.docs {
                seen.check_unique(d, None)?;
                seen.docs.push(d.clone());
            }
        }
        data.indexes.push(spec);
        Ok(true)
    }

    fn delete_index(&self, collection: &str, keys: &Document) -> Result<bool, StoreError> {
        if keys.keys().eq(["_id"]) {
            return Err(StoreError::Rejected("cannot drop the _id index".into()));
        }
        let name = index_name(keys);
        let mut guard = self.inner.write();
        let Some(data) = guard.get_mut(collection) else {
            return Ok(false);
        };
        let before = data.indexes.len();
        data.indexes.retain(|i| i.name != name);
        Ok(data.indexes.len() < before)
    }

    fn delete_indexes(&self, collection: &str) -> Result<(), StoreError> {
        if let Some(data) = self.inner.write().get_mut(collection) {
            data.indexes.retain(|i| i.name == ID_INDEX);
        }
        Ok(())
    }

    fn index_info(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let guard = self.inner.read();
        Ok(match guard.get(collection) {
            Some(data) => data.indexes.iter().map(IndexSpec::describe).collect(),
            None => Vec::new(),
        })
    }

    fn drop_collection(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().remove(collection).is_some())
    }

    fn run_command(&self, command: &Document) -> Result<Document, StoreError> {
        let Some((name, arg)) = command.iter().next() else {
            return Err(StoreError::Command("empty command document".into()));
        };
        match name.as_str() {
            "ping" => Ok(doc! {"ok": 1.0}),
            "count" => {
                let collection = arg
                    .as_str()
                    .ok_or_else(|| StoreError::Command("count needs a collection name".into()))?;
                let query = command.get_document("query").cloned().unwrap_or_default();
                let n = self.count_matching(collection, &query)?;
                Ok(doc! {"n": i64::try_from(n).unwrap_or(i64::MAX), "ok": 1.0})
            }
            "drop" => {
                let collection = arg
                    .as_str()
                    .ok_or_else(|| StoreError::Command("drop needs a collection name".into()))?;
                if self.drop_collection(collection)? {
                    Ok(doc! {"ns": format!("{}.{collection}", self.database), "ok": 1.0})
                } else {
                    Err(StoreError::Command(format!("ns not found: {collection}")))
                }
            }
            "listCollections" => {
                let batch: Vec<Bson> = self
                    .collection_names()
                    .into_iter()
                    .map(|n| Bson::Document(doc! {"name": n, "type": "collection"}))
                    .collect();
                Ok(doc! {"cursor": {"firstBatch": batch, "ns": format!("{}.$cmd.listCollections", self.database)}, "ok": 1.0})
            }
            "dropDatabase" => {
                self.inner.write().clear();
                Ok(doc! {"dropped": self.database.clone(), "ok": 1.0})
            }
            other => Err(StoreError::Command(format!("no such command: '{other}'"))),
        }
    }
}
