use serde::{Deserialize, Serialize};
use std::fmt;

/// Limit applied when the caller never set one.
pub const DEFAULT_LIMIT: i64 = 999_999;
pub const DEFAULT_OFFSET: i64 = 0;

/// Collection name recorded for raw commands, which are database-scoped.
pub const COMMAND_NAMESPACE: &str = "$cmd";

/// Terminal operation kinds, as recorded in the query log and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Get,
    Count,
    Insert,
    BatchInsert,
    Update,
    UpdateAll,
    Delete,
    DeleteAll,
    AddIndex,
    RemoveIndex,
    RemoveAllIndexes,
    ListIndexes,
    DropCollection,
    Command,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Count => "count",
            Self::Insert => "insert",
            Self::BatchInsert => "batch_insert",
            Self::Update => "update",
            Self::UpdateAll => "update_all",
            Self::Delete => "delete",
            Self::DeleteAll => "delete_all",
            Self::AddIndex => "add_index",
            Self::RemoveIndex => "remove_index",
            Self::RemoveAllIndexes => "remove_all_indexes",
            Self::ListIndexes => "list_indexes",
            Self::DropCollection => "drop_collection",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
