use bson::Document;

/// Overlays caller options on `defaults`. Keys the defaults don't know are kept.
#[must_use]
pub fn merge_options(mut defaults: Document, overrides: &Document) -> Document {
    for (k, v) in overrides {
        defaults.insert(k.clone(), v.clone());
    }
    defaults
}

/// Default option documents for writes, stamped with the configured safety key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDefaults {
    safety: String,
}

impl WriteDefaults {
    #[must_use]
    pub fn new(safety: impl Into<String>) -> Self {
        Self { safety: safety.into() }
    }

    #[must_use]
    pub fn safety_key(&self) -> &str {
        &self.safety
    }

    fn base(&self) -> Document {
        let mut d = Document::new();
        d.insert(self.safety.clone(), true);
        d
    }

    #[must_use]
    pub fn insert(&self) -> Document {
        self.base()
    }

    #[must_use]
    pub fn update(&self, multiple: bool) -> Document {
        let mut d = self.base();
        d.insert("multiple", multiple);
        d
    }

    #[must_use]
    pub fn remove(&self, just_one: bool) -> Document {
        let mut d = self.base();
        d.insert("justOne", just_one);
        d
    }
}
