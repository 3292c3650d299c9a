use bson::Document;

use super::eval::{compare_docs, project};

/// Lazily shaped result set. Sort, skip, limit and projection are applied once,
/// on the first read.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    docs: Vec<Document>,
    sort: Document,
    skip: usize,
    limit: Option<usize>,
    projection: Document,
    pos: usize,
    prepared: bool,
}

impl Cursor {
    #[must_use]
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs, ..Self::default() }
    }

    #[must_use]
    pub fn with_projection(mut self, projection: Document) -> Self {
        self.projection = projection;
        self
    }

    /// `0` means no cap.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = (n > 0).then_some(n);
        self
    }

    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = sort;
        self
    }

    fn prepare(&mut self) {
        if self.prepared {
            return;
        }
        self.prepared = true;
        let mut docs = std::mem::take(&mut self.docs);
        if !self.sort.is_empty() {
            docs.sort_by(|a, b| compare_docs(a, b, &self.sort));
        }
        let take = self.limit.unwrap_or(usize::MAX);
        self.docs =
            docs.into_iter().skip(self.skip).take(take).map(|d| project(&d, &self.projection)).collect();
    }

    pub fn advance(&mut self) -> Option<Document> {
        self.prepare();
        let d = self.docs.get(self.pos).cloned()?;
        self.pos += 1;
        Some(d)
    }

    pub fn has_next(&mut self) -> bool {
        self.prepare();
        self.pos < self.docs.len()
    }

    #[must_use]
    pub fn to_vec(mut self) -> Vec<Document> {
        self.prepare();
        self.docs.split_off(self.pos.min(self.docs.len()))
    }
}

impl Iterator for Cursor {
    type Item = Document;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
