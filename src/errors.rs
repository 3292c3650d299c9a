use thiserror::Error;

use crate::query::Action;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum QbError {
    /// Caller-usage error detected before any store interaction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{action} on `{collection}` failed: {source}")]
    Store {
        action: Action,
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl QbError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn store(action: Action, collection: &str, source: StoreError) -> Self {
        Self::Store { action, collection: collection.to_string(), source }
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
