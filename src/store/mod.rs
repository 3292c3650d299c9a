//! The store boundary: everything the builder needs from a document-store driver.

mod apply;
mod cursor;
mod eval;
mod memory;

use bson::{Bson, Document};
use thiserror::Error;

pub use apply::apply_update;
pub use cursor::Cursor;
pub use eval::{compare_bson, compare_docs, matches, project};
pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

/// A handle onto one database of a document store.
///
/// Options documents are passed through from the caller after defaults are merged
/// in; implementations ignore keys they don't understand.
pub trait Store: Send + Sync {
    fn find(
        &self,
        collection: &str,
        filter: &Document,
        projection: &Document,
    ) -> Result<Cursor, StoreError>;

    /// Matching documents after skipping `skip` and capping at `limit` (0 = no cap).
    fn count(
        &self,
        collection: &str,
        filter: &Document,
        limit: usize,
        skip: usize,
    ) -> Result<u64, StoreError>;

    /// Returns the stored document's `_id`.
    fn insert(
        &self,
        collection: &str,
        document: Document,
        options: &Document,
    ) -> Result<Option<Bson>, StoreError>;

    fn batch_insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: &Document,
    ) -> Result<Document, StoreError>;

    fn update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: &Document,
    ) -> Result<UpdateReport, StoreError>;

    fn remove(
        &self,
        collection: &str,
        filter: &Document,
        options: &Document,
    ) -> Result<bool, StoreError>;

    fn ensure_index(
        &self,
        collection: &str,
        keys: &Document,
        options: &Document,
    ) -> Result<bool, StoreError>;

    fn delete_index(&self, collection: &str, keys: &Document) -> Result<bool, StoreError>;

    fn delete_indexes(&self, collection: &str) -> Result<(), StoreError>;

    fn index_info(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    fn drop_collection(&self, collection: &str) -> Result<bool, StoreError>;

    fn run_command(&self, command: &Document) -> Result<Document, StoreError>;
}
