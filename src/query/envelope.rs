use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use super::builder::QueryBuilder;
use super::direction::{Direction, normalize};
use super::filter::Wheres;
use super::types::{Action, DEFAULT_LIMIT, DEFAULT_OFFSET};
use super::update::Updates;
use crate::utils::num::bson_to_i64_lenient;

/// Everything a terminal operation compiles from, owned by one builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub(crate) wheres: Wheres,
    pub(crate) updates: Updates,
    includes: Vec<String>,
    excludes: Vec<String>,
    sorts: Vec<(String, Direction)>,
    limit: i64,
    offset: i64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            wheres: Wheres::default(),
            updates: Updates::default(),
            includes: Vec::new(),
            excludes: Vec::new(),
            sorts: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

/// The request a terminal operation hands to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub filter: Document,
    pub update: Document,
    pub projection: Document,
    pub sort: Document,
    pub limit: i64,
    pub offset: i64,
}

/// Snapshot of the most recent successful terminal operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryLog {
    pub collection: String,
    pub action: Option<Action>,
    pub filter: Document,
    pub update: Document,
    pub projection: Document,
    pub limit: i64,
    pub offset: i64,
    pub sort: Document,
}

impl QueryLog {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.action.is_none()
    }
}

impl Envelope {
    fn include(&mut self, field: &str) {
        if !self.includes.iter().any(|f| f == field) {
            self.includes.push(field.to_string());
        }
    }

    fn exclude(&mut self, field: &str) {
        if !self.excludes.iter().any(|f| f == field) {
            self.excludes.push(field.to_string());
        }
    }

    /// Inclusions win: once any field is included, exclusions never surface.
    #[must_use]
    pub fn projection(&self) -> Document {
        if self.includes.is_empty() {
            self.excludes.iter().map(|f| (f.clone(), Bson::Int32(0))).collect()
        } else {
            self.includes.iter().map(|f| (f.clone(), Bson::Int32(1))).collect()
        }
    }

    fn order(&mut self, field: &str, dir: Direction) {
        match self.sorts.iter_mut().find(|(f, _)| f == field) {
            Some(entry) => entry.1 = dir,
            None => self.sorts.push((field.to_string(), dir)),
        }
    }

    #[must_use]
    pub fn sort(&self) -> Document {
        self.sorts.iter().map(|(f, d)| (f.clone(), Bson::from(*d))).collect()
    }

    /// Accepts numeric input >= 1; anything else leaves the limit unchanged.
    pub fn set_limit(&mut self, value: &Bson) -> bool {
        match bson_to_i64_lenient(value) {
            Some(n) if n >= 1 => {
                self.limit = n;
                true
            }
            _ => false,
        }
    }

    /// Accepts numeric input >= 0; anything else leaves the offset unchanged.
    pub fn set_offset(&mut self, value: &Bson) -> bool {
        match bson_to_i64_lenient(value) {
            Some(n) if n >= 0 => {
                self.offset = n;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.limit
    }

    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.offset
    }

    #[must_use]
    pub fn compile(&self) -> CompiledQuery {
        CompiledQuery {
            filter: self.wheres.compile(),
            update: self.updates.compile(),
            projection: self.projection(),
            sort: self.sort(),
            limit: self.limit,
            offset: self.offset,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl CompiledQuery {
    #[must_use]
    pub fn into_log(self, collection: &str, action: Action) -> QueryLog {
        QueryLog {
            collection: collection.to_string(),
            action: Some(action),
            filter: self.filter,
            update: self.update,
            projection: self.projection,
            limit: self.limit,
            offset: self.offset,
            sort: self.sort,
        }
    }
}

impl QueryBuilder {
    /// Projection. Non-empty `includes` are recorded as `1`; otherwise `excludes` as `0`.
    pub fn select<S: AsRef<str>>(&mut self, includes: &[S], excludes: &[S]) -> &mut Self {
        if includes.is_empty() {
            for f in excludes {
                self.envelope.exclude(f.as_ref());
            }
        } else {
            for f in includes {
                self.envelope.include(f.as_ref());
            }
        }
        self
    }

    /// Sort by every entry of `fields`; values go through [`normalize`].
    pub fn order_by(&mut self, fields: Document) -> &mut Self {
        for (field, dir) in &fields {
            self.envelope.order(field, normalize(dir));
        }
        self
    }

    pub fn order_by_field(&mut self, field: &str, dir: impl Into<Bson>) -> &mut Self {
        self.envelope.order(field, normalize(&dir.into()));
        self
    }

    pub fn limit(&mut self, limit: impl Into<Bson>) -> &mut Self {
        let value = limit.into();
        if !self.envelope.set_limit(&value) {
            log::debug!("ignoring invalid limit {value}");
        }
        self
    }

    pub fn offset(&mut self, offset: impl Into<Bson>) -> &mut Self {
        let value = offset.into();
        if !self.envelope.set_offset(&value) {
            log::debug!("ignoring invalid offset {value}");
        }
        self
    }
}
