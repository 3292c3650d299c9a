//! The execution facade: terminal operations over the accumulated envelope.
//!
//! Every terminal call follows the same steps: validate arguments, compile the
//! envelope, call the store, then on success record the [`QueryLog`] and reset.
//! A failed call returns the error and leaves the accumulators as they were.

use bson::{Bson, DateTime, Document};
use std::sync::Arc;

use super::direction::normalize;
use super::envelope::{CompiledQuery, Envelope, QueryLog};
use super::filter::coerce_object_id;
use super::options::{WriteDefaults, merge_options};
use super::types::{Action, COMMAND_NAMESPACE};
use crate::config::{BuilderConfig, DEFAULT_QUERY_SAFETY};
use crate::errors::QbError;
use crate::logger::QUERY_TARGET;
use crate::store::{Cursor, Store, StoreError};
use crate::utils::num::i64_to_usize_saturating;

pub struct QueryBuilder {
    store: Arc<dyn Store>,
    defaults: WriteDefaults,
    pub(crate) envelope: Envelope,
    last: QueryLog,
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("defaults", &self.defaults)
            .field("envelope", &self.envelope)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

/// Trims `collection`, rejecting an empty name with a message naming the
/// operation that needed it.
fn require_collection(collection: &str, action: Action) -> Result<&str, QbError> {
    let name = collection.trim();
    if name.is_empty() {
        return Err(QbError::config(missing_collection_message(action)));
    }
    Ok(name)
}

fn missing_collection_message(action: Action) -> &'static str {
    match action {
        Action::Get => "In order to retrieve documents from MongoDB, a collection name must be passed",
        Action::Count => {
            "In order to retrieve a count of documents from MongoDB, a collection name must be passed"
        }
        Action::Insert | Action::BatchInsert => "No Mongo collection selected to insert into",
        Action::Update | Action::UpdateAll => "No Mongo collection selected to update",
        Action::Delete | Action::DeleteAll => "No Mongo collection selected to delete from",
        Action::AddIndex => "No Mongo collection specified to add index to",
        Action::RemoveIndex => "No Mongo collection specified to remove index from",
        Action::RemoveAllIndexes => "No Mongo collection specified to remove all indexes from",
        Action::ListIndexes => "No Mongo collection specified to list indexes of",
        Action::DropCollection => "No Mongo collection specified to drop",
        Action::Command => "No Mongo collection specified for command",
    }
}

impl QueryBuilder {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            defaults: WriteDefaults::new(DEFAULT_QUERY_SAFETY),
            envelope: Envelope::default(),
            last: QueryLog::default(),
        }
    }

    /// Builder over `store` using the write-safety key from `config`.
    ///
    /// # Errors
    /// `Configuration` when the config's DSN does not validate.
    pub fn with_config(store: Arc<dyn Store>, config: &BuilderConfig) -> Result<Self, QbError> {
        let settings = config.validate()?;
        let mut qb = Self::new(store);
        qb.defaults = WriteDefaults::new(settings.query_safety);
        Ok(qb)
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// The most recent successful terminal operation, or an empty record.
    #[must_use]
    pub const fn last_query(&self) -> &QueryLog {
        &self.last
    }

    /// What a terminal call would compile right now. Does not reset anything.
    #[must_use]
    pub fn snapshot(&self) -> CompiledQuery {
        self.envelope.compile()
    }

    /// `seconds` since the epoch, or now.
    #[must_use]
    pub fn date(seconds: Option<i64>) -> DateTime {
        seconds.map_or_else(DateTime::now, |s| DateTime::from_millis(s.saturating_mul(1000)))
    }

    fn finish(&mut self, collection: &str, action: Action, compiled: CompiledQuery) {
        let log = compiled.into_log(collection, action);
        log::info!(
            target: QUERY_TARGET,
            "{action} {collection} {}",
            serde_json::to_string(&log).unwrap_or_default()
        );
        crate::utils::devlog::trace_request(&log);
        self.last = log;
        self.envelope.reset();
    }

    fn failed(action: Action, collection: &str, err: StoreError) -> QbError {
        log::warn!("{action} on `{collection}` failed: {err}");
        QbError::store(action, collection, err)
    }

    fn open_cursor(&self, collection: &str, compiled: &CompiledQuery) -> Result<Cursor, StoreError> {
        let cursor = self.store.find(collection, &compiled.filter, &compiled.projection)?;
        Ok(cursor
            .sort(compiled.sort.clone())
            .skip(i64_to_usize_saturating(compiled.offset))
            .limit(i64_to_usize_saturating(compiled.limit)))
    }

    /// Runs the accumulated query and collects the results.
    ///
    /// # Errors
    /// `Configuration` for an empty collection name, `Store` when the store fails.
    pub fn get(&mut self, collection: &str) -> Result<Vec<Document>, QbError> {
        let collection = require_collection(collection, Action::Get)?;
        let compiled = self.envelope.compile();
        let cursor = self
            .open_cursor(collection, &compiled)
            .map_err(|e| Self::failed(Action::Get, collection, e))?;
        self.finish(collection, Action::Get, compiled);
        Ok(cursor.to_vec())
    }

    /// Like [`get`](Self::get) but hands back the cursor unread.
    pub fn get_cursor(&mut self, collection: &str) -> Result<Cursor, QbError> {
        let collection = require_collection(collection, Action::Get)?;
        let compiled = self.envelope.compile();
        let cursor = self
            .open_cursor(collection, &compiled)
            .map_err(|e| Self::failed(Action::Get, collection, e))?;
        self.finish(collection, Action::Get, compiled);
        Ok(cursor)
    }

    pub fn get_where(&mut self, collection: &str, map: Document) -> Result<Vec<Document>, QbError> {
        require_collection(collection, Action::Get)?;
        self.where_all(map).get(collection)
    }

    pub fn count(&mut self, collection: &str) -> Result<u64, QbError> {
        let collection = require_collection(collection, Action::Count)?;
        let compiled = self.envelope.compile();
        let n = self
            .store
            .count(
                collection,
                &compiled.filter,
                i64_to_usize_saturating(compiled.limit),
                i64_to_usize_saturating(compiled.offset),
            )
            .map_err(|e| Self::failed(Action::Count, collection, e))?;
        self.finish(collection, Action::Count, compiled);
        Ok(n)
    }

    pub fn insert(&mut self, collection: &str, document: Document) -> Result<Option<Bson>, QbError> {
        self.insert_with(collection, document, &Document::new())
    }

    /// Inserts one document. `None` means the store accepted the call but stored nothing.
    ///
    /// # Errors
    /// `Configuration` for an empty collection name or document.
    pub fn insert_with(
        &mut self,
        collection: &str,
        document: Document,
        options: &Document,
    ) -> Result<Option<Bson>, QbError> {
        let collection = require_collection(collection, Action::Insert)?;
        if document.is_empty() {
            return Err(QbError::config("Nothing to insert into Mongo collection or insert is not an array"));
        }
        let options = merge_options(self.defaults.insert(), options);
        let compiled = self.envelope.compile();
        let id = self
            .store
            .insert(collection, document, &options)
            .map_err(|e| Self::failed(Action::Insert, collection, e))?;
        self.finish(collection, Action::Insert, compiled);
        Ok(id)
    }

    pub fn batch_insert(
        &mut self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Document, QbError> {
        self.batch_insert_with(collection, documents, &Document::new())
    }

    pub fn batch_insert_with(
        &mut self,
        collection: &str,
        documents: Vec<Document>,
        options: &Document,
    ) -> Result<Document, QbError> {
        let collection = require_collection(collection, Action::BatchInsert)?;
        if documents.is_empty() || documents.iter().any(Document::is_empty) {
            return Err(QbError::config("Nothing to insert into Mongo collection or insert is not an array"));
        }
        let options = merge_options(self.defaults.insert(), options);
        let compiled = self.envelope.compile();
        let result = self
            .store
            .batch_insert(collection, documents, &options)
            .map_err(|e| Self::failed(Action::BatchInsert, collection, e))?;
        self.finish(collection, Action::BatchInsert, compiled);
        Ok(result)
    }

    fn run_update(
        &mut self,
        collection: &str,
        action: Action,
        multiple: bool,
        options: &Document,
    ) -> Result<Option<u64>, QbError> {
        let collection = require_collection(collection, action)?;
        if self.envelope.updates.is_empty() {
            return Err(QbError::config("Nothing to update in Mongo collection or update is not an array"));
        }
        let options = merge_options(self.defaults.update(multiple), options);
        let compiled = self.envelope.compile();
        let report = self
            .store
            .update(collection, &compiled.filter, &compiled.update, &options)
            .map_err(|e| Self::failed(action, collection, e))?;
        self.finish(collection, action, compiled);
        Ok((report.matched > 0).then_some(report.matched))
    }

    /// Updates the first matching document. `None` when nothing matched.
    ///
    /// # Errors
    /// `Configuration` for an empty collection name or no accumulated update.
    pub fn update(&mut self, collection: &str) -> Result<Option<u64>, QbError> {
        self.run_update(collection, Action::Update, false, &Document::new())
    }

    pub fn update_with(&mut self, collection: &str, options: &Document) -> Result<Option<u64>, QbError> {
        self.run_update(collection, Action::Update, false, options)
    }

    pub fn update_all(&mut self, collection: &str) -> Result<Option<u64>, QbError> {
        self.run_update(collection, Action::UpdateAll, true, &Document::new())
    }

    pub fn update_all_with(
        &mut self,
        collection: &str,
        options: &Document,
    ) -> Result<Option<u64>, QbError> {
        self.run_update(collection, Action::UpdateAll, true, options)
    }

    fn run_remove(&mut self, collection: &str, action: Action, just_one: bool) -> Result<bool, QbError> {
        let collection = require_collection(collection, action)?;
        let options = self.defaults.remove(just_one);
        let mut compiled = self.envelope.compile();
        if !just_one {
            coerce_object_id(&mut compiled.filter);
        }
        let ok = self
            .store
            .remove(collection, &compiled.filter, &options)
            .map_err(|e| Self::failed(action, collection, e))?;
        self.finish(collection, action, compiled);
        Ok(ok)
    }

    pub fn delete(&mut self, collection: &str) -> Result<bool, QbError> {
        self.run_remove(collection, Action::Delete, true)
    }

    /// Removes every match. A string `_id` that parses as an `ObjectId` is compared as one.
    pub fn delete_all(&mut self, collection: &str) -> Result<bool, QbError> {
        self.run_remove(collection, Action::DeleteAll, false)
    }

    /// Ensures an index over `fields`; each direction goes through [`normalize`].
    ///
    /// # Errors
    /// `Configuration` for an empty collection or field set; `Store` when the store
    /// refuses the index.
    pub fn add_index(
        &mut self,
        collection: &str,
        fields: &Document,
        options: &Document,
    ) -> Result<&mut Self, QbError> {
        let collection = require_collection(collection, Action::AddIndex)?;
        if fields.is_empty() {
            return Err(QbError::config("Index could not be created to MongoDB Collection because no keys were specified"));
        }
        let keys = normalized_keys(fields);
        let compiled = self.envelope.compile();
        let created = self
            .store
            .ensure_index(collection, &keys, options)
            .map_err(|e| Self::failed(Action::AddIndex, collection, e))?;
        if !created {
            return Err(Self::failed(
                Action::AddIndex,
                collection,
                StoreError::Rejected("an error occurred when trying to add an index".into()),
            ));
        }
        self.finish(collection, Action::AddIndex, compiled);
        Ok(self)
    }

    pub fn remove_index(&mut self, collection: &str, keys: &Document) -> Result<&mut Self, QbError> {
        let collection = require_collection(collection, Action::RemoveIndex)?;
        if keys.is_empty() {
            return Err(QbError::config("Index could not be removed from MongoDB Collection because no keys were specified"));
        }
        let keys = normalized_keys(keys);
        let compiled = self.envelope.compile();
        let removed = self
            .store
            .delete_index(collection, &keys)
            .map_err(|e| Self::failed(Action::RemoveIndex, collection, e))?;
        if !removed {
            return Err(Self::failed(
                Action::RemoveIndex,
                collection,
                StoreError::Rejected("an error occurred when trying to remove an index".into()),
            ));
        }
        self.finish(collection, Action::RemoveIndex, compiled);
        Ok(self)
    }

    pub fn remove_all_indexes(&mut self, collection: &str) -> Result<&mut Self, QbError> {
        let collection = require_collection(collection, Action::RemoveAllIndexes)?;
        let compiled = self.envelope.compile();
        self.store
            .delete_indexes(collection)
            .map_err(|e| Self::failed(Action::RemoveAllIndexes, collection, e))?;
        self.finish(collection, Action::RemoveAllIndexes, compiled);
        Ok(self)
    }

    pub fn list_indexes(&mut self, collection: &str) -> Result<Vec<Document>, QbError> {
        let collection = require_collection(collection, Action::ListIndexes)?;
        let compiled = self.envelope.compile();
        let info = self
            .store
            .index_info(collection)
            .map_err(|e| Self::failed(Action::ListIndexes, collection, e))?;
        self.finish(collection, Action::ListIndexes, compiled);
        Ok(info)
    }

    pub fn drop_collection(&mut self, collection: &str) -> Result<bool, QbError> {
        let collection = require_collection(collection, Action::DropCollection)?;
        let compiled = self.envelope.compile();
        let dropped = self
            .store
            .drop_collection(collection)
            .map_err(|e| Self::failed(Action::DropCollection, collection, e))?;
        self.finish(collection, Action::DropCollection, compiled);
        Ok(dropped)
    }

    /// Sends `command` to the store unmodified.
    pub fn command(&mut self, command: &Document) -> Result<Document, QbError> {
        let compiled = self.envelope.compile();
        let result = self
            .store
            .run_command(command)
            .map_err(|e| Self::failed(Action::Command, COMMAND_NAMESPACE, e))?;
        self.finish(COMMAND_NAMESPACE, Action::Command, compiled);
        Ok(result)
    }
}

fn normalized_keys(fields: &Document) -> Document {
    fields.iter().map(|(f, dir)| (f.clone(), Bson::from(normalize(dir)))).collect()
}
