use bson::{Bson, Document, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::builder::QueryBuilder;

/// Characters escaped before a `where_like` value is turned into a pattern.
const LIKE_METACHARACTERS: &[char] = &['.', '\\', '+', '*', '?', '[', '^', ']', '$', '(', ')'];

/// Compiled regular-expression predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pattern: String,
    flags: String,
}

impl Pattern {
    #[must_use]
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), flags: flags.into() }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut d = Document::new();
        d.insert("$regex", self.pattern.clone());
        d.insert("$options", self.flags.clone());
        d
    }
}

/// Options for [`QueryBuilder::where_like_with`].
///
/// A wildcard flag left at `true` leaves that end of the pattern open; `false`
/// anchors it with `^` / `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeOptions {
    pub flags: String,
    pub start_wildcard: bool,
    pub end_wildcard: bool,
}

impl Default for LikeOptions {
    fn default() -> Self {
        Self { flags: "i".to_string(), start_wildcard: true, end_wildcard: true }
    }
}

impl LikeOptions {
    #[must_use]
    pub fn flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    #[must_use]
    pub fn anchored(mut self, start: bool, end: bool) -> Self {
        self.start_wildcard = !start;
        self.end_wildcard = !end;
        self
    }
}

#[must_use]
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if LIKE_METACHARACTERS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[must_use]
pub fn like_pattern(value: &str, opts: &LikeOptions) -> Pattern {
    let mut p = escape_like(value.trim());
    if !opts.start_wildcard {
        p.insert(0, '^');
    }
    if !opts.end_wildcard {
        p.push('$');
    }
    Pattern::new(p, opts.flags.clone())
}

/// One field's predicate inside the filter document.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Bson),
    Ops(Document),
    Like(Pattern),
}

impl Predicate {
    fn to_bson(&self) -> Bson {
        match self {
            Self::Eq(v) => v.clone(),
            Self::Ops(d) => Bson::Document(d.clone()),
            Self::Like(p) => Bson::Document(p.to_document()),
        }
    }
}

/// Filter accumulator. Field order follows first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wheres {
    fields: Vec<(String, Predicate)>,
    or: Option<Vec<Document>>,
}

impl Wheres {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.or.is_none()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Predicate> {
        self.fields.iter().find(|(f, _)| f == field).map(|(_, p)| p)
    }

    fn slot(&mut self, field: &str) -> &mut Predicate {
        let idx = match self.fields.iter().position(|(f, _)| f == field) {
            Some(i) => i,
            None => {
                self.fields.push((field.to_string(), Predicate::Ops(Document::new())));
                self.fields.len() - 1
            }
        };
        &mut self.fields[idx].1
    }

    pub fn set_literal(&mut self, field: &str, value: Bson) {
        *self.slot(field) = Predicate::Eq(value);
    }

    pub fn set_pattern(&mut self, field: &str, pattern: Pattern) {
        *self.slot(field) = Predicate::Like(pattern);
    }

    /// Operator map for `field`, replacing a literal or pattern that was there.
    fn ops_mut(&mut self, field: &str) -> &mut Document {
        let slot = self.slot(field);
        if !matches!(slot, Predicate::Ops(_)) {
            *slot = Predicate::Ops(Document::new());
        }
        match slot {
            Predicate::Ops(d) => d,
            _ => unreachable!("operator map installed above"),
        }
    }

    pub fn set_op(&mut self, field: &str, op: &str, value: Bson) {
        self.ops_mut(field).insert(op, value);
    }

    pub fn push_or(&mut self, fragment: Document) {
        self.or.get_or_insert_with(Vec::new).push(fragment);
    }

    #[must_use]
    pub fn compile(&self) -> Document {
        let mut out = Document::new();
        for (field, pred) in &self.fields {
            out.insert(field.clone(), pred.to_bson());
        }
        if let Some(branches) = &self.or {
            out.insert("$or", branches.iter().cloned().map(Bson::Document).collect::<Vec<_>>());
        }
        out
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.or = None;
    }
}

/// Turns a string `_id` that looks like an `ObjectId` into one, so deletes by id
/// hit documents whose ids were generated by the store.
pub(crate) fn coerce_object_id(filter: &mut Document) {
    if let Some(Bson::String(s)) = filter.get("_id")
        && let Ok(oid) = ObjectId::parse_str(s)
    {
        filter.insert("_id", oid);
    }
}

impl QueryBuilder {
    /// Equality predicate on one field. Replaces whatever that field held.
    pub fn where_eq(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.wheres.set_literal(field, value.into());
        self
    }

    /// Equality predicates for every entry of `map`.
    pub fn where_all(&mut self, map: Document) -> &mut Self {
        for (field, value) in map {
            self.envelope.wheres.set_literal(&field, value);
        }
        self
    }

    /// Appends one `$or` branch per entry. Empty maps are ignored.
    pub fn or_where(&mut self, map: Document) -> &mut Self {
        for (field, value) in map {
            let mut fragment = Document::new();
            fragment.insert(field, value);
            self.envelope.wheres.push_or(fragment);
        }
        self
    }

    pub fn where_in<V: Into<Bson>>(&mut self, field: &str, values: Vec<V>) -> &mut Self {
        self.envelope.wheres.set_op(field, "$in", to_array(values));
        self
    }

    pub fn where_in_all<V: Into<Bson>>(&mut self, field: &str, values: Vec<V>) -> &mut Self {
        self.envelope.wheres.set_op(field, "$all", to_array(values));
        self
    }

    pub fn where_not_in<V: Into<Bson>>(&mut self, field: &str, values: Vec<V>) -> &mut Self {
        self.envelope.wheres.set_op(field, "$nin", to_array(values));
        self
    }

    pub fn where_gt(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.wheres.set_op(field, "$gt", value.into());
        self
    }

    pub fn where_gte(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.wheres.set_op(field, "$gte", value.into());
        self
    }

    pub fn where_lt(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.wheres.set_op(field, "$lt", value.into());
        self
    }

    pub fn where_lte(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.wheres.set_op(field, "$lte", value.into());
        self
    }

    pub fn where_ne(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.wheres.set_op(field, "$ne", value.into());
        self
    }

    /// Inclusive range: `$gte` low, `$lte` high.
    pub fn where_between(
        &mut self,
        field: &str,
        low: impl Into<Bson>,
        high: impl Into<Bson>,
    ) -> &mut Self {
        let ops = self.envelope.wheres.ops_mut(field);
        ops.insert("$gte", low.into());
        ops.insert("$lte", high.into());
        self
    }

    /// Exclusive range: `$gt` low, `$lt` high.
    pub fn where_between_ne(
        &mut self,
        field: &str,
        low: impl Into<Bson>,
        high: impl Into<Bson>,
    ) -> &mut Self {
        let ops = self.envelope.wheres.ops_mut(field);
        ops.insert("$gt", low.into());
        ops.insert("$lt", high.into());
        self
    }

    /// Geospatial proximity. A later call with the other `spherical` value leaves the
    /// earlier `$near`/`$nearSphere` key in place.
    pub fn where_near(
        &mut self,
        field: &str,
        coords: impl Into<Bson>,
        distance: Option<f64>,
        spherical: bool,
    ) -> &mut Self {
        let ops = self.envelope.wheres.ops_mut(field);
        let key = if spherical { "$nearSphere" } else { "$near" };
        ops.insert(key, coords.into());
        if let Some(d) = distance {
            ops.insert("$maxDistance", d);
        }
        self
    }

    /// Case-insensitive substring match.
    pub fn where_like(&mut self, field: &str, value: &str) -> &mut Self {
        self.where_like_with(field, value, &LikeOptions::default())
    }

    pub fn where_like_with(&mut self, field: &str, value: &str, opts: &LikeOptions) -> &mut Self {
        let pattern = like_pattern(value, opts);
        self.envelope.wheres.set_pattern(field.trim(), pattern);
        self
    }
}

fn to_array<V: Into<Bson>>(values: Vec<V>) -> Bson {
    Bson::Array(values.into_iter().map(Into::into).collect())
}
