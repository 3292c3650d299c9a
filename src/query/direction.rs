use bson::Bson;
use serde::{Deserialize, Serialize};

/// Canonical sort/index direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

impl From<Direction> for Bson {
    fn from(d: Direction) -> Self {
        Self::Int32(d.as_i32())
    }
}

/// Maps a symbolic direction to `Asc`/`Desc`.
///
/// Integer `-1`, `false`, and `"desc"` in any case mean descending. Anything else,
/// including unknown strings, is ascending.
#[must_use]
pub fn normalize(value: &Bson) -> Direction {
    match value {
        Bson::Int32(-1) | Bson::Int64(-1) | Bson::Boolean(false) => Direction::Desc,
        Bson::String(s) if s.eq_ignore_ascii_case("desc") => Direction::Desc,
        _ => Direction::Asc,
    }
}
