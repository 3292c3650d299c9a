use bson::{Bson, Document};

use super::builder::QueryBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Inc,
    Set,
    Unset,
    AddToSet,
    Push,
    Pop,
    Pull,
    Rename,
}

impl UpdateOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inc => "$inc",
            Self::Set => "$set",
            Self::Unset => "$unset",
            Self::AddToSet => "$addToSet",
            Self::Push => "$push",
            Self::Pop => "$pop",
            Self::Pull => "$pull",
            Self::Rename => "$rename",
        }
    }
}

/// Update-document accumulator keyed by operator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Updates {
    doc: Document,
}

impl Updates {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    /// Payload mapping for a field-keyed operator, created empty on first use.
    fn payload(&mut self, op: UpdateOp) -> &mut Document {
        let key = op.as_str();
        if !matches!(self.doc.get(key), Some(Bson::Document(_))) {
            self.doc.insert(key, Document::new());
        }
        match self.doc.get_mut(key) {
            Some(Bson::Document(d)) => d,
            _ => unreachable!("payload installed above"),
        }
    }

    pub fn put(&mut self, op: UpdateOp, field: &str, value: Bson) {
        self.payload(op).insert(field, value);
    }

    pub fn put_all(&mut self, op: UpdateOp, map: Document) {
        let payload = self.payload(op);
        for (field, value) in map {
            payload.insert(field, value);
        }
    }

    /// `$pull` holds a single pair; each call discards the previous one.
    pub fn replace_pull(&mut self, field: &str, criteria: Bson) {
        let mut pair = Document::new();
        pair.insert(field, criteria);
        self.doc.insert(UpdateOp::Pull.as_str(), pair);
    }

    pub fn push_rename(&mut self, old: &str, new: &str) {
        let key = UpdateOp::Rename.as_str();
        let mut pair = Document::new();
        pair.insert(old, new);
        match self.doc.get_mut(key) {
            Some(Bson::Array(pairs)) => pairs.push(Bson::Document(pair)),
            _ => {
                self.doc.insert(key, vec![Bson::Document(pair)]);
            }
        }
    }

    #[must_use]
    pub fn compile(&self) -> Document {
        self.doc.clone()
    }

    pub fn clear(&mut self) {
        self.doc.clear();
    }
}

impl QueryBuilder {
    pub fn inc(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.updates.put(UpdateOp::Inc, field, value.into());
        self
    }

    pub fn inc_all(&mut self, map: Document) -> &mut Self {
        self.envelope.updates.put_all(UpdateOp::Inc, map);
        self
    }

    /// Writes `value` into `$inc` unchanged. Pass a negative amount to subtract.
    pub fn dec(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.updates.put(UpdateOp::Inc, field, value.into());
        self
    }

    pub fn dec_all(&mut self, map: Document) -> &mut Self {
        self.envelope.updates.put_all(UpdateOp::Inc, map);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.updates.put(UpdateOp::Set, field, value.into());
        self
    }

    pub fn set_all(&mut self, map: Document) -> &mut Self {
        self.envelope.updates.put_all(UpdateOp::Set, map);
        self
    }

    pub fn unset_field(&mut self, field: &str) -> &mut Self {
        self.unset_fields(&[field])
    }

    pub fn unset_fields<S: AsRef<str>>(&mut self, fields: &[S]) -> &mut Self {
        let map = fields.iter().map(|f| (f.as_ref().to_string(), Bson::Int32(1))).collect();
        self.envelope.updates.put_all(UpdateOp::Unset, map);
        self
    }

    /// A scalar is added as is. A list is wrapped in `$each`, so the store adds
    /// every element instead of the list itself.
    pub fn add_to_set(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        match value.into() {
            Bson::Array(items) => self.add_each_to_set(field, items),
            scalar => {
                self.envelope.updates.put(UpdateOp::AddToSet, field, scalar);
                self
            }
        }
    }

    /// Adds every element not already present, via `$each`.
    pub fn add_each_to_set<V: Into<Bson>>(&mut self, field: &str, values: Vec<V>) -> &mut Self {
        let mut each = Document::new();
        each.insert("$each", values.into_iter().map(Into::into).collect::<Vec<Bson>>());
        self.envelope.updates.put(UpdateOp::AddToSet, field, Bson::Document(each));
        self
    }

    pub fn push(&mut self, field: &str, value: impl Into<Bson>) -> &mut Self {
        self.envelope.updates.put(UpdateOp::Push, field, value.into());
        self
    }

    pub fn push_all(&mut self, map: Document) -> &mut Self {
        self.envelope.updates.put_all(UpdateOp::Push, map);
        self
    }

    /// Always removes the first element (`-1`).
    pub fn pop(&mut self, field: &str) -> &mut Self {
        self.pop_fields(&[field])
    }

    pub fn pop_fields<S: AsRef<str>>(&mut self, fields: &[S]) -> &mut Self {
        let map = fields.iter().map(|f| (f.as_ref().to_string(), Bson::Int32(-1))).collect();
        self.envelope.updates.put_all(UpdateOp::Pop, map);
        self
    }

    pub fn pull(&mut self, field: &str, criteria: impl Into<Bson>) -> &mut Self {
        self.envelope.updates.replace_pull(field, criteria.into());
        self
    }

    pub fn rename_field(&mut self, old: &str, new: &str) -> &mut Self {
        self.envelope.updates.push_rename(old, new);
        self
    }
}
