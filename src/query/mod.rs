//! Query and update clause building.
//!
//! Accumulators live on [`QueryBuilder`]; its `impl` blocks are split by concern:
//! predicates in `filter`, update directives in `update`, projection/sort/paging in
//! `envelope`, and terminal operations in `builder`.

mod builder;
mod direction;
mod envelope;
mod filter;
mod options;
mod types;
mod update;

pub use builder::QueryBuilder;
pub use direction::{Direction, normalize};
pub use envelope::{CompiledQuery, Envelope, QueryLog};
pub use filter::{LikeOptions, Pattern, Predicate, Wheres, escape_like, like_pattern};
pub use options::{WriteDefaults, merge_options};
pub use types::{Action, COMMAND_NAMESPACE, DEFAULT_LIMIT, DEFAULT_OFFSET};
pub use update::{UpdateOp, Updates};
