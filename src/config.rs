//! Connection and builder settings.
//!
//! The DSN is handed to the store driver untouched; the builder only needs the
//! database name out of it and the write-safety key it stamps on write options.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::QbError;

pub const DEFAULT_DSN: &str = "mongodb://localhost:27017/admin";
pub const DEFAULT_PERSIST_KEY: &str = "mongoqb";
pub const DEFAULT_QUERY_SAFETY: &str = "safe";

fn default_dsn() -> String {
    DEFAULT_DSN.to_string()
}
const fn default_persist() -> bool {
    true
}
fn default_persist_key() -> String {
    DEFAULT_PERSIST_KEY.to_string()
}
fn default_query_safety() -> String {
    DEFAULT_QUERY_SAFETY.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default = "default_dsn")]
    pub dsn: String,
    #[serde(default = "default_persist")]
    pub persist: bool,
    #[serde(default = "default_persist_key")]
    pub persist_key: String,
    #[serde(default)]
    pub replica_set: Option<String>,
    /// Option key used for acknowledged writes (`safe`, `w`, ...).
    #[serde(default = "default_query_safety")]
    pub query_safety: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            dsn: default_dsn(),
            persist: default_persist(),
            persist_key: default_persist_key(),
            replica_set: None,
            query_safety: default_query_safety(),
        }
    }
}

/// Settings after validation: trimmed values plus the database name taken from the DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub dsn: String,
    pub database: String,
    pub persist_key: Option<String>,
    pub replica_set: Option<String>,
    pub query_safety: String,
}

impl BuilderConfig {
    #[must_use]
    pub fn with_dsn(dsn: impl Into<String>) -> Self {
        Self { dsn: dsn.into(), ..Self::default() }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, QbError> {
        Ok(toml::from_str::<Self>(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, QbError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| QbError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    /// Validates the DSN and extracts the database name (path after the host list).
    ///
    /// # Errors
    /// `Configuration` when the DSN is empty or names no database.
    pub fn validate(&self) -> Result<ConnectionSettings, QbError> {
        let dsn = self.dsn.trim();
        if dsn.is_empty() {
            return Err(QbError::config("The DSN is empty"));
        }
        let database = database_from_dsn(dsn);
        if database.is_empty() {
            return Err(QbError::config("The database name must be set in the DSN string"));
        }
        let query_safety = match self.query_safety.trim() {
            "" => DEFAULT_QUERY_SAFETY.to_string(),
            s => s.to_string(),
        };
        let persist_key = self.persist.then(|| self.persist_key.trim().to_string());
        let replica_set =
            self.replica_set.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Ok(ConnectionSettings {
            dsn: dsn.to_string(),
            database: database.to_string(),
            persist_key,
            replica_set,
            query_safety,
        })
    }
}

// mongodb://host[:port][,host2]/db[?options]
fn database_from_dsn(dsn: &str) -> &str {
    let rest = dsn.split_once("://").map_or(dsn, |(_, r)| r);
    match rest.split_once('/') {
        // last path segment, so a trailing slash leaves no name
        Some((_, path)) => {
            path.split('?').next().unwrap_or("").rsplit('/').next().unwrap_or("").trim()
        }
        None => "",
    }
}
