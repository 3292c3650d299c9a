//! Stateful MongoDB-style query builder.
//!
//! A [`QueryBuilder`] accumulates filter predicates, update directives, projection,
//! sort and paging through chained calls, then a terminal operation compiles them
//! into documents, runs them against a [`Store`], records the request in a
//! [`QueryLog`] and resets for the next query.
//!
//! ```no_run
//! use bson::doc;
//! use nexusqb::{MemoryStore, QueryBuilder};
//!
//! let mut qb = QueryBuilder::new(MemoryStore::shared("app"));
//! qb.insert("people", doc! {"name": "John", "age": 22})?;
//! let adults = qb.where_gte("age", 18).order_by_field("name", "asc").limit(10).get("people")?;
//! assert_eq!(adults.len(), 1);
//! # Ok::<(), nexusqb::QbError>(())
//! ```

pub mod config;
pub mod errors;
pub mod logger;
pub mod query;
pub mod store;
pub mod utils;

pub use config::{BuilderConfig, ConnectionSettings};
pub use errors::QbError;
pub use query::{Action, CompiledQuery, Direction, LikeOptions, QueryBuilder, QueryLog};
pub use store::{Cursor, MemoryStore, Store, StoreError, UpdateReport};

/// Configures logging from the `NEXUSQB_*` environment variables.
///
/// # Errors
/// Returns an error if the log directory cannot be created or log4rs rejects the config.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::configure_from_env()
}
